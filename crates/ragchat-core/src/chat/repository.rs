//! ChatRepository trait definition.
//!
//! Provides CRUD operations for chat sessions and their messages.

use ragchat_types::chat::{ChatMessage, ChatSession};
use ragchat_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for chat session and message persistence.
///
/// Implementations live in ragchat-infra (e.g., `SqliteChatRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatRepository: Send + Sync {
    fn create_session(
        &self,
        session: &ChatSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatSession>, RepositoryError>> + Send;

    /// Sessions owned by `user_id`, newest first.
    fn list_sessions(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSession>, RepositoryError>> + Send;

    /// Overwrite name, favorite flag and `updated_at`.
    ///
    /// Returns `RepositoryError::NotFound` if the session does not exist.
    fn update_session(
        &self,
        session: &ChatSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a session and all of its messages. Returns whether it existed.
    fn delete_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    fn save_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Messages of a session ordered by `created_at` ascending.
    fn get_messages(
        &self,
        session_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;
}
