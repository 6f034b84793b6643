//! Bearer-token extraction: extract the token, validate it, inject the
//! authenticated identity into the request, as an axum extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http::error::ApiError;
use crate::http::state::AppState;
use crate::identity;
use calc_shared::error::CalcError;

/// The authenticated user id, extracted from `Authorization: Bearer <jwt>`.
pub struct AuthUser(pub i64);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(CalcError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(CalcError::Unauthorized)?;

        let claims = identity::verify_token(token, &state.config.jwt_secret)?;
        Ok(AuthUser(claims.sub))
    }
}
