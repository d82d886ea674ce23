//! # Web API Error Types
//!
//! HTTP-facing error type and its status-code mapping, built on thiserror
//! and axum's `IntoResponse`. The crate-internal taxonomy converts into
//! this at the handler boundary; no handler reasons about status codes
//! itself.

use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream dependency unavailable")]
    Unavailable,

    #[error("internal server error")]
    Internal,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            ApiError::BadRequest(message) => ("BAD_REQUEST", message.clone()),
            ApiError::Unauthorized => ("UNAUTHORIZED", "authentication required".to_string()),
            ApiError::NotFound(message) => ("NOT_FOUND", message.clone()),
            ApiError::Conflict(message) => ("CONFLICT", message.clone()),
            ApiError::Unavailable => (
                "SERVICE_UNAVAILABLE",
                "upstream dependency unavailable".to_string(),
            ),
            ApiError::Internal => ("INTERNAL_ERROR", "internal server error".to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));
        (status, body).into_response()
    }
}

/// One mapping from the crate taxonomy to HTTP, used by every handler.
impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            Error::Unauthorized(_) => ApiError::Unauthorized,
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::UpstreamTransient(_) | Error::Upstream(_) | Error::Timeout { .. } => {
                ApiError::Unavailable
            }
            Error::StorageTransient(_)
            | Error::Storage(_)
            | Error::Configuration(_)
            | Error::StateInconsistency(_)
            | Error::Internal(_) => ApiError::Internal,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::from(Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_variants() {
        assert!(matches!(
            ApiError::from(Error::validation("bad")),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(Error::Unauthorized("nope".into())),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from(Error::conflict("dup")),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(Error::UpstreamTransient("503".into())),
            ApiError::Unavailable
        ));
        assert!(matches!(
            ApiError::from(Error::Storage("oops".into())),
            ApiError::Internal
        ));
    }
}
