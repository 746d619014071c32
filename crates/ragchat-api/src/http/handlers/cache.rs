//! Cache maintenance.
//!
//! - DELETE /api/chat/cache - Drop every cached session, list and message page

use axum::extract::State;

use ragchat_core::chat::CacheStats;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// DELETE /api/chat/cache - Clear all chat caches. Returns the entry counts
/// that were dropped.
pub async fn clear_caches(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<ApiResponse<CacheStats>, AppError> {
    let dropped = state.chat_service.clear_caches();
    Ok(ApiResponse::ok("All caches cleared successfully", dropped))
}
