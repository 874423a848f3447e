use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use renderd_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON
/// error responses; the status codes are part of the API contract
/// (404 expected-absent, 409 retry-now, 503 retry-later, 504 gave-up).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `renderd_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", core.to_string())
                }
                CoreError::NotConfigured(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "NOT_CONFIGURED",
                    core.to_string(),
                ),
                CoreError::Capacity(msg) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "CAPACITY", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::EmptyResult => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EMPTY_RESULT",
                    core.to_string(),
                ),
                CoreError::DeadlineExceeded(_) => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "DEADLINE_EXCEEDED",
                    core.to_string(),
                ),
                CoreError::Unsupported(_) => {
                    (StatusCode::BAD_REQUEST, "UNSUPPORTED", core.to_string())
                }
                CoreError::Provider(_) | CoreError::Storage(_) => {
                    tracing::error!(error = %core, "Upstream failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "UPSTREAM_ERROR",
                        core.to_string(),
                    )
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
