//! Conversation handler: stores the user's message, asks the provider
//! through the resilient caller and stores the reply.
//!
//! A provider outage never fails the request. The reply is then the
//! configured fallback text and `fallbackUsed` is true.

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use ragchat_types::chat::ChatMessage;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::request::{parse_uuid, Json};
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// The stored assistant message.
    pub message: ChatMessage,
    pub fallback_used: bool,
}

/// POST /api/chat/sessions/{id}/chat - One conversation turn.
pub async fn chat(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<ChatRequest>,
) -> Result<ApiResponse<ChatReply>, AppError> {
    let id = parse_uuid(&id)?;
    let turn = state
        .chat_service
        .chat(&id, &body.message, &state.caller, &state.config.provider)
        .await?;

    Ok(ApiResponse::ok(
        "Chat response generated successfully",
        ChatReply {
            message: turn.assistant_message,
            fallback_used: turn.fallback_used,
        },
    ))
}
