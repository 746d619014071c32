//! Session CRUD HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/chat/session                 - Create a session
//! - GET    /api/chat/session/{id}            - Get a single session
//! - PUT    /api/chat/session/{id}            - Rename / set favorite
//! - DELETE /api/chat/session/{id}            - Delete a session and its messages
//! - PATCH  /api/chat/session/{id}/favorite   - Toggle the favorite flag
//! - GET    /api/chat/sessions?user_id=       - List a user's sessions

use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use ragchat_types::chat::{ChatSession, NewSession, SessionUpdate};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::request::{parse_uuid, Json, Query};
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for session listing.
#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    #[serde(default, alias = "userId")]
    pub user_id: String,
}

/// POST /api/chat/session - Create a new chat session.
pub async fn create_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<NewSession>,
) -> Result<ApiResponse<ChatSession>, AppError> {
    tracing::info!(user_id = %body.user_id, "Received request to create session");
    let session = state.chat_service.create_session(body).await?;
    Ok(ApiResponse::ok("Session creation completed", session))
}

/// GET /api/chat/session/{id} - Get session details.
pub async fn get_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<ApiResponse<ChatSession>, AppError> {
    let id = parse_uuid(&id)?;
    let session = state.chat_service.get_session(&id).await?;
    Ok(ApiResponse::ok("Session fetched successfully", session))
}

/// GET /api/chat/sessions?user_id= - List sessions for a user, newest first.
pub async fn list_sessions(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<SessionListQuery>,
) -> Result<ApiResponse<Vec<ChatSession>>, AppError> {
    let sessions = state.chat_service.list_sessions(&query.user_id).await?;
    Ok(ApiResponse::ok("Sessions fetched successfully", sessions))
}

/// PUT /api/chat/session/{id} - Update name and favorite flag.
pub async fn update_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<SessionUpdate>,
) -> Result<ApiResponse<ChatSession>, AppError> {
    let id = parse_uuid(&id)?;
    let session = state.chat_service.update_session(&id, body).await?;
    Ok(ApiResponse::ok("Session updated successfully", session))
}

/// DELETE /api/chat/session/{id} - Delete a session and its messages.
pub async fn delete_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    let id = parse_uuid(&id)?;
    state.chat_service.delete_session(&id).await?;
    Ok(ApiResponse::empty(StatusCode::OK, "Session deleted successfully"))
}

/// PATCH /api/chat/session/{id}/favorite - Flip the favorite flag.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<ApiResponse<ChatSession>, AppError> {
    let id = parse_uuid(&id)?;
    let session = state.chat_service.toggle_favorite(&id).await?;
    Ok(ApiResponse::ok("Favorite toggled successfully", session))
}
