//! Domain error type. One variant per failure kind; `status_code` is the
//! single place that maps a domain error to an HTTP status, via
//! constructor helpers plus a classification method rather than matching
//! on the enum at every call site.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalcError {
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("login already taken")]
    Conflict,

    #[error("storage error: {0}")]
    Storage(String),
}

impl CalcError {
    pub fn invalid_expression(msg: impl Into<String>) -> Self {
        CalcError::InvalidExpression(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        CalcError::BadRequest(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        CalcError::NotFound(what.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        CalcError::InvalidState(msg.into())
    }

    /// HTTP status this error maps to, per the user-facing and worker
    /// protocol error tables.
    pub fn status_code(&self) -> u16 {
        match self {
            CalcError::InvalidExpression(_) => 422,
            CalcError::BadRequest(_) => 400,
            CalcError::Unauthorized => 401,
            CalcError::NotFound(_) => 404,
            CalcError::InvalidState(_) => 400,
            CalcError::Conflict => 400,
            CalcError::Storage(_) => 500,
        }
    }
}

impl From<sqlx::Error> for CalcError {
    fn from(err: sqlx::Error) -> Self {
        CalcError::Storage(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for CalcError {
    fn from(_err: jsonwebtoken::errors::Error) -> Self {
        CalcError::Unauthorized
    }
}
