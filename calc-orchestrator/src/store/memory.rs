//! In-memory backend: a single mutex guarding plain maps, per the
//! "dynamic map of id->entity with a global lock" design note. The
//! critical section is limited to state transitions, not I/O, since there
//! is no I/O here — this is also the backend this workspace's own test
//! suite runs against.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use calc_shared::error::CalcError;
use calc_shared::types::{Expression, ExpressionStatus, Task, TaskStatus, User};

use super::{NewExpression, Store};

struct Inner {
    next_user_id: i64,
    users: Vec<User>,
    expressions: HashMap<String, Expression>,
    tasks: HashMap<String, Task>,
    /// Insertion order of pending tasks. A plain map can't give FIFO
    /// dispatch order on its own; this queue is what makes
    /// `claim_oldest_pending_task` actually FIFO.
    pending_queue: VecDeque<String>,
}

/// The in-memory backend used when `DATABASE_URL` is unset.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl Default for Inner {
    fn default() -> Self {
        Inner {
            next_user_id: 1,
            users: Vec::new(),
            expressions: HashMap::new(),
            tasks: HashMap::new(),
            pending_queue: VecDeque::new(),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, CalcError> {
        let mut inner = self.inner.lock().await;
        if inner.users.iter().any(|u| u.login == login) {
            return Err(CalcError::Conflict);
        }
        let id = inner.next_user_id;
        inner.next_user_id += 1;
        inner.users.push(User {
            id,
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>, CalcError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|u| u.login == login).cloned())
    }

    async fn insert_expression_with_tasks(&self, new_expr: NewExpression) -> Result<(), CalcError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();

        let expression = Expression {
            id: new_expr.id.clone(),
            user_id: new_expr.user_id,
            expression: new_expr.expression,
            status: ExpressionStatus::Pending,
            result: None,
            root_task_id: new_expr.root_task_id,
            created_at: now,
            updated_at: now,
        };

        let mut task_ids = Vec::with_capacity(new_expr.tasks.len());
        for t in &new_expr.tasks {
            task_ids.push(t.id.clone());
        }

        inner.expressions.insert(expression.id.clone(), expression);
        for t in new_expr.tasks {
            inner.tasks.insert(
                t.id.clone(),
                Task {
                    id: t.id.clone(),
                    expression_id: new_expr.id.clone(),
                    arg1: t.arg1,
                    arg2: t.arg2,
                    operation: t.operation,
                    operation_time_ms: t.operation_time_ms,
                    status: TaskStatus::Pending,
                    result: None,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        inner.pending_queue.extend(task_ids);
        Ok(())
    }

    async fn get_expression(
        &self,
        id: &str,
        owner: Option<i64>,
    ) -> Result<Option<Expression>, CalcError> {
        let inner = self.inner.lock().await;
        Ok(inner.expressions.get(id).and_then(|e| {
            match owner {
                Some(u) if e.user_id != u => None,
                _ => Some(e.clone()),
            }
        }))
    }

    async fn list_expressions_by_user(&self, user_id: i64) -> Result<Vec<Expression>, CalcError> {
        let inner = self.inner.lock().await;
        let mut out: Vec<Expression> = inner
            .expressions
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn update_expression_status(
        &self,
        id: &str,
        status: ExpressionStatus,
        result: Option<f64>,
    ) -> Result<(), CalcError> {
        let mut inner = self.inner.lock().await;
        let expr = inner
            .expressions
            .get_mut(id)
            .ok_or_else(|| CalcError::not_found("expression"))?;
        expr.status = status;
        if result.is_some() {
            expr.result = result;
        }
        expr.updated_at = Utc::now();
        Ok(())
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, CalcError> {
        let inner = self.inner.lock().await;
        Ok(inner.tasks.get(id).cloned())
    }

    async fn list_tasks_by_expression(&self, expression_id: &str) -> Result<Vec<Task>, CalcError> {
        let inner = self.inner.lock().await;
        let mut out: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| t.expression_id == expression_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn claim_oldest_pending_task(&self) -> Result<Option<Task>, CalcError> {
        let mut inner = self.inner.lock().await;
        let Some(task_id) = inner.pending_queue.pop_front() else {
            return Ok(None);
        };
        let now = Utc::now();
        let expression_id = {
            let task = inner
                .tasks
                .get_mut(&task_id)
                .ok_or_else(|| CalcError::not_found("task"))?;
            task.status = TaskStatus::Computing;
            task.updated_at = now;
            task.expression_id.clone()
        };
        if let Some(expr) = inner.expressions.get_mut(&expression_id) {
            if expr.status == ExpressionStatus::Pending {
                expr.status = ExpressionStatus::Computing;
                expr.updated_at = now;
            }
        }
        Ok(inner.tasks.get(&task_id).cloned())
    }

    async fn complete_task_if_computing(&self, id: &str, result: f64) -> Result<bool, CalcError> {
        let mut inner = self.inner.lock().await;
        let Some(task) = inner.tasks.get_mut(id) else {
            return Ok(false);
        };
        if task.status != TaskStatus::Computing {
            return Ok(false);
        }
        task.status = TaskStatus::Done;
        task.result = Some(result);
        task.updated_at = Utc::now();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_graph::NewTask;
    use calc_shared::types::Operation;

    fn sample_expression() -> NewExpression {
        NewExpression {
            id: "E1".into(),
            user_id: 1,
            expression: "2+2".into(),
            root_task_id: "E1_task1".into(),
            tasks: vec![NewTask {
                id: "E1_task1".into(),
                arg1: "2".into(),
                arg2: "2".into(),
                operation: Operation::Add,
                operation_time_ms: 1000,
            }],
        }
    }

    #[tokio::test]
    async fn test_claim_returns_none_when_empty() {
        let store = InMemoryStore::new();
        assert!(store.claim_oldest_pending_task().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_transitions_task_and_expression_to_computing() {
        let store = InMemoryStore::new();
        store.insert_expression_with_tasks(sample_expression()).await.unwrap();
        let task = store.claim_oldest_pending_task().await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Computing);
        let expr = store.get_expression("E1", None).await.unwrap().unwrap();
        assert_eq!(expr.status, ExpressionStatus::Computing);
    }

    #[tokio::test]
    async fn test_claim_is_fifo_across_expressions() {
        let store = InMemoryStore::new();
        let mut first = sample_expression();
        first.id = "E1".into();
        first.tasks[0].id = "E1_task1".into();
        let mut second = sample_expression();
        second.id = "E2".into();
        second.tasks[0].id = "E2_task1".into();

        store.insert_expression_with_tasks(first).await.unwrap();
        store.insert_expression_with_tasks(second).await.unwrap();

        let t1 = store.claim_oldest_pending_task().await.unwrap().unwrap();
        let t2 = store.claim_oldest_pending_task().await.unwrap().unwrap();
        assert_eq!(t1.id, "E1_task1");
        assert_eq!(t2.id, "E2_task1");
    }

    #[tokio::test]
    async fn test_complete_rejects_non_computing_task() {
        let store = InMemoryStore::new();
        store.insert_expression_with_tasks(sample_expression()).await.unwrap();
        // still pending, not computing
        let ok = store.complete_task_if_computing("E1_task1", 4.0).await.unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_complete_rejects_resubmission() {
        let store = InMemoryStore::new();
        store.insert_expression_with_tasks(sample_expression()).await.unwrap();
        store.claim_oldest_pending_task().await.unwrap();
        assert!(store.complete_task_if_computing("E1_task1", 4.0).await.unwrap());
        assert!(!store.complete_task_if_computing("E1_task1", 5.0).await.unwrap());
    }

    #[tokio::test]
    async fn test_expression_visibility_is_owner_scoped() {
        let store = InMemoryStore::new();
        store.insert_expression_with_tasks(sample_expression()).await.unwrap();
        assert!(store.get_expression("E1", Some(1)).await.unwrap().is_some());
        assert!(store.get_expression("E1", Some(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_login_is_rejected() {
        let store = InMemoryStore::new();
        store.create_user("alice", "hash").await.unwrap();
        let err = store.create_user("alice", "hash2").await.unwrap_err();
        assert!(matches!(err, CalcError::Conflict));
    }
}
