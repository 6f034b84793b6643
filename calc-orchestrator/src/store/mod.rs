//! Persistent store abstraction. A trait plus two implementations:
//! `PostgresStore` (production) and `InMemoryStore` (default for local/dev
//! runs and this workspace's own test suite).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use calc_shared::error::CalcError;
use calc_shared::types::{Expression, ExpressionStatus, Task};

use crate::task_graph::NewTask;

/// Everything needed to persist a freshly parsed expression and its task
/// graph in one atomic unit.
#[derive(Debug, Clone)]
pub struct NewExpression {
    pub id: String,
    pub user_id: i64,
    pub expression: String,
    pub root_task_id: String,
    pub tasks: Vec<NewTask>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, CalcError>;

    async fn get_user_by_login(
        &self,
        login: &str,
    ) -> Result<Option<calc_shared::types::User>, CalcError>;

    /// Inserts the expression row and all of its tasks atomically. A
    /// failure partway through must leave nothing visible.
    async fn insert_expression_with_tasks(&self, new_expr: NewExpression) -> Result<(), CalcError>;

    /// `owner` restricts visibility to that user id; `None` is used only
    /// by the scheduler's own internal lookups (e.g. resolving a
    /// reference argument), never by a user-facing handler.
    async fn get_expression(
        &self,
        id: &str,
        owner: Option<i64>,
    ) -> Result<Option<Expression>, CalcError>;

    /// Newest first.
    async fn list_expressions_by_user(&self, user_id: i64) -> Result<Vec<Expression>, CalcError>;

    async fn update_expression_status(
        &self,
        id: &str,
        status: ExpressionStatus,
        result: Option<f64>,
    ) -> Result<(), CalcError>;

    async fn get_task(&self, id: &str) -> Result<Option<Task>, CalcError>;

    /// Oldest first.
    async fn list_tasks_by_expression(&self, expression_id: &str) -> Result<Vec<Task>, CalcError>;

    /// Atomically selects the oldest pending task, transitions it to
    /// `computing`, and transitions its owning expression to `computing`
    /// if it was still `pending`. Returns `None` if nothing is pending.
    /// This is the critical section dispatch safety depends on: two
    /// concurrent callers must never both receive the same task.
    async fn claim_oldest_pending_task(&self) -> Result<Option<Task>, CalcError>;

    /// Atomically transitions a task from `computing` to `done` with the
    /// given result. Returns `false` (no state change) if the task was
    /// not in `computing` — covers both re-submission and out-of-order
    /// submission. The caller is responsible for distinguishing
    /// not-found from wrong-state before calling this.
    async fn complete_task_if_computing(&self, id: &str, result: f64) -> Result<bool, CalcError>;
}
