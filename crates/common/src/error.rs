use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Message returned in place of internal error detail.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An internal server error occurred while processing the notification.";

/// Request-level error types. Channel-level problems never surface here.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Render the error, attaching internal detail as `error` only when `expose` is set.
    pub fn into_response_with_detail(self, expose: bool) -> Response {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": msg })),
            )
                .into_response(),
            AppError::Config(detail) | AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Unhandled error while processing request");
                let body = if expose {
                    json!({
                        "success": false,
                        "message": INTERNAL_ERROR_MESSAGE,
                        "error": detail,
                    })
                } else {
                    json!({ "success": false, "message": INTERNAL_ERROR_MESSAGE })
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_with_detail(false)
    }
}
