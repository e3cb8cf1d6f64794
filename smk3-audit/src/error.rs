//! Error types for smk3-audit

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request or missing prerequisite state (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing, forged or expired bearer token (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Role not allowed to perform the operation (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict (409), e.g. duplicate clause number
    #[error("Conflict: {0}")]
    Conflict(String),

    /// LLM or blob store call failed (500)
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// smk3-common error
    #[error("Common error: {0}")]
    Common(#[from] smk3_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Upstream(msg) => {
                error!("Upstream failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(err) => return common_error_response(err),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Map shared-library errors onto the matching HTTP status
fn common_error_response(err: smk3_common::Error) -> Response {
    use smk3_common::Error as E;

    let mapped = match err {
        E::NotFound(msg) => ApiError::NotFound(msg),
        E::InvalidInput(msg) => ApiError::BadRequest(msg),
        E::Token(msg) => ApiError::Unauthorized(msg),
        other => {
            error!("Internal error: {}", other);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": {
                        "code": "COMMON_ERROR",
                        "message": other.to_string(),
                    }
                })),
            )
                .into_response();
        }
    };
    mapped.into_response()
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
