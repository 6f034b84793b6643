//! Maps `CalcError` to an HTTP response. A local newtype because neither
//! `CalcError` nor `IntoResponse` live in this crate.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use calc_shared::error::CalcError;
use serde_json::json;

pub struct ApiError(pub CalcError);

impl From<CalcError> for ApiError {
    fn from(err: CalcError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "message": self.0.to_string() }))).into_response()
    }
}
