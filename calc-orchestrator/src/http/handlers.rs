//! User-facing routes plus registration/login. The worker protocol routes
//! live in `worker_handlers.rs`.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use calc_shared::types::Expression;

use crate::http::auth::AuthUser;
use crate::http::error::ApiError;
use crate::http::state::AppState;
use crate::identity;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    identity::register(&state.store, &req.login, &req.password).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "user registered" }))))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = identity::login(&state.store, &req.login, &req.password, &state.config.jwt_secret)
        .await?;
    Ok(Json(LoginResponse { token }))
}

#[derive(Deserialize)]
pub struct CalculateRequest {
    pub expression: String,
}

pub async fn calculate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CalculateRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let expr = state
        .scheduler
        .create_expression(user_id, &req.expression)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": expr.id }))))
}

pub async fn list_expressions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Expression>>, ApiError> {
    let list = state.scheduler.list_expressions(user_id).await?;
    Ok(Json(list))
}

pub async fn get_expression(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Expression>, ApiError> {
    let expr = state.scheduler.get_expression(&id, user_id).await?;
    Ok(Json(expr))
}
