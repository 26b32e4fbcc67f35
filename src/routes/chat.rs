use axum::{Json, extract::State};
use tracing::{error, info};

use crate::error::AppError;
use crate::message::{ChatRequest, ChatResponse};
use crate::services::relay::RelayError;
use crate::state::SharedState;

const MAX_MESSAGE_CHARS: usize = 2000;

pub async fn send_message_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if payload.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty.".to_string()));
    }

    if payload.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(
            "Message is too long. Maximum 2000 characters.".to_string(),
        ));
    }

    info!("processing chat message");

    // Validation trims; the message itself goes upstream untouched.
    match state.relay.send_message(&payload.message).await {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(err @ RelayError::Configuration(_)) => {
            error!(error = %err, "chat service configuration error");
            Err(AppError::NotConfigured)
        }
        Err(err) => {
            error!(error = %err, "error communicating with AI endpoint");
            Err(AppError::UpstreamFailed)
        }
    }
}
