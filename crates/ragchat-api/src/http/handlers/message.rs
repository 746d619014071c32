//! Message HTTP handlers.
//!
//! Endpoints:
//! - POST /api/chat/session/{id}/message              - Append a message
//! - GET  /api/chat/session/{id}/messages?page=&size= - One page, oldest first

use axum::extract::{Path, State};
use serde::Deserialize;

use ragchat_core::chat::service::DEFAULT_PAGE_SIZE;
use ragchat_types::chat::{ChatMessage, NewMessage};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::request::{parse_uuid, Json, Query};
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Pagination parameters. `page` 0 and 1 both mean the first page.
#[derive(Debug, Deserialize)]
pub struct MessagePageQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// POST /api/chat/session/{id}/message - Add a message to a session.
pub async fn add_message(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<NewMessage>,
) -> Result<ApiResponse<ChatMessage>, AppError> {
    let id = parse_uuid(&id)?;
    let message = state.chat_service.add_message(&id, body).await?;
    Ok(ApiResponse::ok("Message added successfully", message))
}

/// GET /api/chat/session/{id}/messages - Paginated message history.
pub async fn get_messages(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
    Query(query): Query<MessagePageQuery>,
) -> Result<ApiResponse<Vec<ChatMessage>>, AppError> {
    let id = parse_uuid(&id)?;
    tracing::debug!(session_id = %id, page = query.page, size = query.size, "Fetching messages");
    let messages = state
        .chat_service
        .get_messages(&id, query.page, query.size)
        .await?;
    Ok(ApiResponse::ok("Messages retrieved successfully", messages))
}
