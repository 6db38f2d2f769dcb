use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Token not found or expired")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage backend unavailable: {0}")]
    Backend(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidInput(msg) => AppError::BadRequest(msg.to_string()),
            StoreError::BackendUnavailable(msg) => AppError::Backend(msg),
            StoreError::ConfigurationMissing(msg) => AppError::Internal(msg),
        }
    }
}

// Unreadable bodies get the same JSON error shape as every other failure.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "Token not found or expired".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Backend(msg) => {
                tracing::error!("Storage backend error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage backend unavailable".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
