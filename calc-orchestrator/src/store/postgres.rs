//! Postgres backend: the production store. State transitions that must be
//! atomic (`claim_oldest_pending_task`, `complete_task_if_computing`) are
//! single statements or single short transactions; everything else is
//! per-statement isolation, per the concurrency model's "either SQL
//! transactions or a process-wide mutex" guidance.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use calc_shared::error::CalcError;
use calc_shared::types::{Expression, ExpressionStatus, Operation, Task, TaskStatus, User};

use super::{NewExpression, Store};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, CalcError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| CalcError::Storage(e.to_string()))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| CalcError::Storage(e.to_string()))?;
        Ok(Self { pool })
    }

    fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err.as_database_error(), Some(db_err) if db_err.code().as_deref() == Some("23505"))
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<User, CalcError> {
    Ok(User {
        id: row.try_get("id")?,
        login: row.try_get("login")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_expression(row: &sqlx::postgres::PgRow) -> Result<Expression, CalcError> {
    let status: String = row.try_get("status")?;
    Ok(Expression {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        expression: row.try_get("expression")?,
        status: ExpressionStatus::from_str(&status)?,
        result: row.try_get("result")?,
        root_task_id: row.try_get("root_task_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_task(row: &sqlx::postgres::PgRow) -> Result<Task, CalcError> {
    let status: String = row.try_get("status")?;
    let operation: String = row.try_get("operation")?;
    let operation_time_ms: i64 = row.try_get("operation_time_ms")?;
    Ok(Task {
        id: row.try_get("id")?,
        expression_id: row.try_get("expression_id")?,
        arg1: row.try_get("arg1")?,
        arg2: row.try_get("arg2")?,
        operation: Operation::from_str(&operation)?,
        operation_time_ms: operation_time_ms as u64,
        status: TaskStatus::from_str(&status)?,
        result: row.try_get("result")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl Store for PostgresStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, CalcError> {
        let result = sqlx::query("INSERT INTO users (login, password_hash) VALUES ($1, $2) RETURNING id")
            .bind(login)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(row.try_get::<i64, _>("id")?),
            Err(e) if Self::is_unique_violation(&e) => Err(CalcError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>, CalcError> {
        let row = sqlx::query("SELECT * FROM users WHERE login = $1")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn insert_expression_with_tasks(&self, new_expr: NewExpression) -> Result<(), CalcError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO expressions (id, user_id, expression, status, root_task_id) \
             VALUES ($1, $2, $3, 'pending', $4)",
        )
        .bind(&new_expr.id)
        .bind(new_expr.user_id)
        .bind(&new_expr.expression)
        .bind(&new_expr.root_task_id)
        .execute(&mut *tx)
        .await?;

        for task in &new_expr.tasks {
            sqlx::query(
                "INSERT INTO tasks (id, expression_id, arg1, arg2, operation, operation_time_ms, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, 'pending')",
            )
            .bind(&task.id)
            .bind(&new_expr.id)
            .bind(&task.arg1)
            .bind(&task.arg2)
            .bind(task.operation.to_string())
            .bind(task.operation_time_ms as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_expression(
        &self,
        id: &str,
        owner: Option<i64>,
    ) -> Result<Option<Expression>, CalcError> {
        let row = match owner {
            Some(user_id) => {
                sqlx::query("SELECT * FROM expressions WHERE id = $1 AND user_id = $2")
                    .bind(id)
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM expressions WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        row.as_ref().map(row_to_expression).transpose()
    }

    async fn list_expressions_by_user(&self, user_id: i64) -> Result<Vec<Expression>, CalcError> {
        let rows = sqlx::query("SELECT * FROM expressions WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_expression).collect()
    }

    async fn update_expression_status(
        &self,
        id: &str,
        status: ExpressionStatus,
        result: Option<f64>,
    ) -> Result<(), CalcError> {
        let affected = sqlx::query(
            "UPDATE expressions SET status = $1, result = COALESCE($2, result), updated_at = now() \
             WHERE id = $3",
        )
        .bind(status.to_string())
        .bind(result)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(CalcError::not_found("expression"));
        }
        Ok(())
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, CalcError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_task).transpose()
    }

    async fn list_tasks_by_expression(&self, expression_id: &str) -> Result<Vec<Task>, CalcError> {
        let rows = sqlx::query("SELECT * FROM tasks WHERE expression_id = $1 ORDER BY created_at ASC")
            .bind(expression_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn claim_oldest_pending_task(&self) -> Result<Option<Task>, CalcError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "UPDATE tasks SET status = 'computing', updated_at = now() \
             WHERE id = ( \
                SELECT id FROM tasks WHERE status = 'pending' \
                ORDER BY created_at ASC LIMIT 1 FOR UPDATE SKIP LOCKED \
             ) RETURNING *",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let task = row.as_ref().map(row_to_task).transpose()?;

        if let Some(task) = &task {
            sqlx::query(
                "UPDATE expressions SET status = 'computing', updated_at = now() \
                 WHERE id = $1 AND status = 'pending'",
            )
            .bind(&task.expression_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(task)
    }

    async fn complete_task_if_computing(&self, id: &str, result: f64) -> Result<bool, CalcError> {
        let affected = sqlx::query(
            "UPDATE tasks SET status = 'done', result = $1, updated_at = now() \
             WHERE id = $2 AND status = 'computing'",
        )
        .bind(result)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected == 1)
    }
}
