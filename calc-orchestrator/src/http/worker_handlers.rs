//! The worker-facing protocol surface. Stateless — all state lives in the
//! store via the scheduler.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use calc_shared::types::{Operation, Task, TaskStatus};

use crate::http::error::ApiError;
use crate::http::state::AppState;
use calc_shared::error::CalcError;

/// Wire shape for a task. `operation_time` (not `operation_time_ms`) is
/// the field name the worker protocol uses.
#[derive(Serialize)]
pub struct TaskDto {
    pub id: String,
    pub expression_id: String,
    pub arg1: String,
    pub arg2: String,
    pub operation: Operation,
    pub operation_time: u64,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
}

impl From<Task> for TaskDto {
    fn from(t: Task) -> Self {
        TaskDto {
            id: t.id,
            expression_id: t.expression_id,
            arg1: t.arg1,
            arg2: t.arg2,
            operation: t.operation,
            operation_time: t.operation_time_ms,
            status: t.status,
            result: t.result,
        }
    }
}

pub async fn next_task(State(state): State<AppState>) -> Result<Json<TaskDto>, ApiError> {
    match state.scheduler.next_task().await? {
        Some(task) => Ok(Json(task.into())),
        None => Err(ApiError(CalcError::not_found("task"))),
    }
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskDto>, ApiError> {
    let task = state
        .scheduler
        .get_task_by_id(&id)
        .await?
        .ok_or_else(|| CalcError::not_found("task"))?;
    Ok(Json(task.into()))
}

#[derive(Deserialize)]
pub struct SubmitResultRequest {
    pub result: f64,
}

pub async fn submit_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubmitResultRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    state.scheduler.submit_task_result(&id, req.result).await?;
    Ok((StatusCode::OK, Json(json!({ "message": "result accepted" }))))
}
