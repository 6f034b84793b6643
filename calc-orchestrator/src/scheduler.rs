//! Scheduler. Owns every task/expression state transition. All methods
//! are safe to call concurrently; atomicity of `next_task` and
//! `submit_task_result` is delegated to the store's compare-and-swap
//! primitives (`claim_oldest_pending_task`, `complete_task_if_computing`).

use std::sync::Arc;

use calc_shared::config::AppConfig;
use calc_shared::error::CalcError;
use calc_shared::types::{Expression, ExpressionStatus, Task};
use uuid::Uuid;

use crate::parser;
use crate::store::{NewExpression, Store};
use crate::task_graph::build_task_graph;

#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn Store>,
    config: Arc<AppConfig>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// Parses `text`, builds its task graph, and persists both atomically.
    /// Returns `invalid-expression` without persisting anything on parse
    /// failure — including the submit-time divide-by-zero sanity check.
    #[tracing::instrument(skip(self, text))]
    pub async fn create_expression(
        &self,
        user_id: i64,
        text: &str,
    ) -> Result<Expression, CalcError> {
        let tree = parser::parse(text)?;

        // Expression ids use a true unique id (UUIDv7) rather than the
        // reference's nanosecond-clock timestamp, which can collide under
        // rapid submission.
        let expression_id = Uuid::now_v7().to_string();
        let (tasks, root_task_id) = build_task_graph(&tree, &expression_id, &self.config);

        let new_expr = NewExpression {
            id: expression_id.clone(),
            user_id,
            expression: text.to_string(),
            root_task_id,
            tasks,
        };
        self.store.insert_expression_with_tasks(new_expr).await?;

        self.store
            .get_expression(&expression_id, None)
            .await?
            .ok_or_else(|| CalcError::Storage("expression vanished after insert".into()))
    }

    /// Selects and claims the oldest pending task, if any, per the FIFO
    /// dispatch ordering.
    #[tracing::instrument(skip(self))]
    pub async fn next_task(&self) -> Result<Option<Task>, CalcError> {
        self.store.claim_oldest_pending_task().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, task_id: &str) -> Result<Option<Task>, CalcError> {
        self.store.get_task(task_id).await
    }

    /// Records a worker's result. Rejects the submission if the task is
    /// absent or not in `computing` (covers re-submission and
    /// out-of-order submission). On success, re-evaluates whether the
    /// owning expression is now fully done.
    #[tracing::instrument(skip(self))]
    pub async fn submit_task_result(&self, task_id: &str, result: f64) -> Result<(), CalcError> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| CalcError::not_found("task"))?;

        if task.status != calc_shared::types::TaskStatus::Computing {
            return Err(CalcError::invalid_state(
                "task is not awaiting a result",
            ));
        }

        let applied = self.store.complete_task_if_computing(task_id, result).await?;
        if !applied {
            return Err(CalcError::invalid_state(
                "task is not awaiting a result",
            ));
        }

        self.finalize_if_complete(&task.expression_id).await
    }

    /// Fetches all tasks for the expression; if every one is done, stamps
    /// the expression done with the root task's result. Otherwise marks
    /// it computing. Uses the stored `root_task_id` rather than scanning
    /// for "last task with a non-nil result".
    async fn finalize_if_complete(&self, expression_id: &str) -> Result<(), CalcError> {
        let tasks = self.store.list_tasks_by_expression(expression_id).await?;
        let all_done = tasks
            .iter()
            .all(|t| t.status == calc_shared::types::TaskStatus::Done);

        if !all_done {
            self.store
                .update_expression_status(expression_id, ExpressionStatus::Computing, None)
                .await?;
            return Ok(());
        }

        let expr = self
            .store
            .get_expression(expression_id, None)
            .await?
            .ok_or_else(|| CalcError::Storage("expression vanished during finalization".into()))?;
        let root = tasks
            .iter()
            .find(|t| t.id == expr.root_task_id)
            .ok_or_else(|| CalcError::Storage("root task missing from expression".into()))?;
        let root_result = root
            .result
            .ok_or_else(|| CalcError::Storage("root task done without a result".into()))?;

        self.store
            .update_expression_status(expression_id, ExpressionStatus::Done, Some(root_result))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_expression(
        &self,
        id: &str,
        user_id: i64,
    ) -> Result<Expression, CalcError> {
        self.store
            .get_expression(id, Some(user_id))
            .await?
            .ok_or_else(|| CalcError::not_found("expression"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_expressions(&self, user_id: i64) -> Result<Vec<Expression>, CalcError> {
        self.store.list_expressions_by_user(user_id).await
    }
}
