use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;

/// Request-level error taxonomy. Every variant maps to exactly one status
/// at the response boundary; nothing below the handlers ever sees HTTP.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing required input — user-correctable.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Referenced record id does not exist.
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Auth(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            Self::Internal(e) => {
                error!(err = %e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
