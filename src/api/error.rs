use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::storage::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    Input(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    /// A relay leg against the backing store failed. `message` is client-safe;
    /// `detail` carries the upstream description only when the development
    /// switch allows exposing it.
    #[error("Bad Gateway: {message}")]
    Upstream {
        message: String,
        detail: Option<String>,
    },

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Collapse a backing-store failure onto the HTTP surface. `unavailable`
    /// becomes the client-facing 502 message for transfer-shaped failures.
    pub fn from_store(err: StoreError, unavailable: &str, expose_details: bool) -> Self {
        match err {
            StoreError::SizeExceeded(_) => {
                AppError::PayloadTooLarge("File is too large for the storage channel".to_string())
            }
            StoreError::NotFound(_) => AppError::NotFound("File not found".to_string()),
            other => {
                tracing::error!("❌ Backing store failure: {}", other);
                AppError::Upstream {
                    message: unavailable.to_string(),
                    detail: expose_details.then(|| other.to_string()),
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            AppError::Input(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Upstream { message, detail } => (StatusCode::BAD_GATEWAY, message, detail),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": message
        });
        if let Some(detail) = detail {
            body["details"] = json!(detail);
        }

        (status, Json(body)).into_response()
    }
}
