// src/error.rs
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Client-facing failure classes. The generic variants carry no configuration
/// or upstream detail; the handler logs the original cause before converting
/// to one of these.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("chat service is not configured")]
    NotConfigured,

    #[error("upstream AI service failed")]
    UpstreamFailed,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Chat service is not configured. Please contact an administrator.".to_string(),
            ),
            AppError::UpstreamFailed => (
                StatusCode::BAD_GATEWAY,
                "Failed to get a response from the AI service. Please try again later.".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
