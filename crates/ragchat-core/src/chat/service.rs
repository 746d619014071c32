//! Chat service orchestrating session lifecycle and message persistence.
//!
//! ChatService validates inbound payloads, enforces that messages belong to
//! an existing session, and runs a chat turn: persist the user's message,
//! ask the provider through the [`ResilientCaller`], persist the reply.
//!
//! Session lookups, per-user lists and message pages are served from a
//! [`ChatCache`] when present; every write evicts what it touched.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use ragchat_types::chat::{
    ChatMessage, ChatSession, MessageRole, NewMessage, NewSession, SessionUpdate,
    message_violation, session_name_violation,
};
use ragchat_types::config::ProviderSettings;
use ragchat_types::error::{ChatError, RepositoryError};
use ragchat_types::llm::{CompletionRequest, Message};

use crate::chat::cache::{CacheStats, ChatCache};
use crate::chat::repository::ChatRepository;
use crate::llm::provider::LlmProvider;
use crate::resilience::wrapper::ResilientCaller;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Result of one conversation turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
    /// True when the assistant text is the degraded fallback reply.
    pub fallback_used: bool,
}

/// Orchestrates chat session lifecycle and message persistence.
///
/// Generic over `ChatRepository` so ragchat-core never depends on
/// ragchat-infra.
pub struct ChatService<R: ChatRepository> {
    repo: R,
    cache: ChatCache,
}

impl<R: ChatRepository> ChatService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            cache: ChatCache::new(),
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached read. Returns what was dropped.
    pub fn clear_caches(&self) -> CacheStats {
        let dropped = self.cache.clear();
        info!(
            sessions = dropped.sessions,
            session_lists = dropped.session_lists,
            message_pages = dropped.message_pages,
            "Chat caches cleared"
        );
        dropped
    }

    // --- Sessions ---

    pub async fn create_session(&self, new: NewSession) -> Result<ChatSession, ChatError> {
        new.validate().map_err(ChatError::Validation)?;

        let now = Utc::now();
        let session = ChatSession {
            id: Uuid::now_v7(),
            user_id: new.user_id,
            name: new.name.trim().to_string(),
            favorite: new.favorite,
            created_at: now,
            updated_at: now,
        };
        self.repo.create_session(&session).await?;
        self.cache.evict_session(&session);
        info!(session_id = %session.id, user_id = %session.user_id, "Chat session created");
        Ok(session)
    }

    pub async fn get_session(&self, id: &Uuid) -> Result<ChatSession, ChatError> {
        if let Some(session) = self.cache.session(id) {
            return Ok(session);
        }
        let seen = self.cache.generation();
        let session = self
            .repo
            .get_session(id)
            .await?
            .ok_or(ChatError::SessionNotFound(*id))?;
        self.cache.fill_session(seen, &session);
        Ok(session)
    }

    /// All sessions of a user, newest first.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, ChatError> {
        if let Some(msg) = ragchat_types::chat::user_id_violation(user_id) {
            return Err(ChatError::field("userId", msg));
        }
        if let Some(sessions) = self.cache.sessions_of(user_id) {
            return Ok(sessions);
        }
        let seen = self.cache.generation();
        let sessions = self.repo.list_sessions(user_id).await?;
        self.cache.fill_sessions_of(seen, user_id, &sessions);
        Ok(sessions)
    }

    /// Rename a session and set its favorite flag. The name is required.
    pub async fn update_session(
        &self,
        id: &Uuid,
        update: SessionUpdate,
    ) -> Result<ChatSession, ChatError> {
        let name = match update.name.as_deref() {
            Some(name) => {
                if let Some(msg) = session_name_violation(name) {
                    return Err(ChatError::field("name", msg));
                }
                name.trim().to_string()
            }
            None => return Err(ChatError::field("name", "Session name is required")),
        };

        let mut session = self.get_session(id).await?;
        session.name = name;
        session.favorite = update.favorite;
        session.updated_at = Utc::now();
        self.persist_update(&session).await?;
        info!(session_id = %id, "Chat session updated");
        Ok(session)
    }

    /// Delete a session together with its messages.
    pub async fn delete_session(&self, id: &Uuid) -> Result<(), ChatError> {
        let deleted = self.repo.delete_session(id).await;
        // Evict even on a miss: a stale cached copy must not outlive the row.
        self.cache.evict_deleted(id);
        if deleted? {
            info!(session_id = %id, "Chat session deleted");
            Ok(())
        } else {
            Err(ChatError::SessionNotFound(*id))
        }
    }

    pub async fn toggle_favorite(&self, id: &Uuid) -> Result<ChatSession, ChatError> {
        let mut session = self.get_session(id).await?;
        session.favorite = !session.favorite;
        session.updated_at = Utc::now();
        self.persist_update(&session).await?;
        Ok(session)
    }

    async fn persist_update(&self, session: &ChatSession) -> Result<(), ChatError> {
        let result = self.repo.update_session(session).await;
        self.cache.evict_session(session);
        match result {
            Ok(()) => Ok(()),
            // Deleted between read and write.
            Err(RepositoryError::NotFound) => Err(ChatError::SessionNotFound(session.id)),
            Err(e) => Err(e.into()),
        }
    }

    // --- Messages ---

    pub async fn add_message(
        &self,
        session_id: &Uuid,
        new: NewMessage,
    ) -> Result<ChatMessage, ChatError> {
        let sender = new.validate().map_err(ChatError::Validation)?;
        self.get_session(session_id).await?;
        self.save_message(*session_id, sender, new.message).await
    }

    /// One page of a session's messages, oldest first.
    ///
    /// `page` is 1-based; 0 is treated as the first page. `size` is clamped
    /// to `1..=MAX_PAGE_SIZE`.
    pub async fn get_messages(
        &self,
        session_id: &Uuid,
        page: u32,
        size: u32,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        self.get_session(session_id).await?;
        let page = page.max(1);
        let size = size.clamp(1, MAX_PAGE_SIZE);
        let key = (*session_id, page, size);
        if let Some(messages) = self.cache.page(&key) {
            return Ok(messages);
        }

        let seen = self.cache.generation();
        let offset = i64::from(page - 1) * i64::from(size);
        let messages = self
            .repo
            .get_messages(session_id, i64::from(size), offset)
            .await?;
        self.cache.fill_page(seen, key, &messages);
        Ok(messages)
    }

    async fn save_message(
        &self,
        session_id: Uuid,
        sender: MessageRole,
        text: String,
    ) -> Result<ChatMessage, ChatError> {
        let now = Utc::now();
        let message = ChatMessage {
            id: Uuid::now_v7(),
            session_id,
            sender,
            message: text,
            created_at: now,
            updated_at: now,
        };
        self.repo.save_message(&message).await?;
        self.cache.evict_pages(&session_id);
        Ok(message)
    }

    // --- Conversation ---

    /// Run one conversation turn against the provider.
    ///
    /// The user's message is stored before the provider is called, so it
    /// survives a provider outage. The assistant reply is always stored: the
    /// real completion, or the fallback text when the resilient call degraded.
    pub async fn chat<P: LlmProvider>(
        &self,
        session_id: &Uuid,
        text: &str,
        caller: &ResilientCaller<P>,
        settings: &ProviderSettings,
    ) -> Result<ChatTurn, ChatError> {
        if let Some(msg) = message_violation(text) {
            return Err(ChatError::field("message", msg));
        }
        self.get_session(session_id).await?;

        let user_message = self
            .save_message(*session_id, MessageRole::User, text.to_string())
            .await?;

        let request = CompletionRequest {
            model: settings.model.clone(),
            messages: vec![Message::user(text)],
            temperature: settings.temperature,
        };
        let outcome = caller.invoke(&request).await;
        let fallback_used = outcome.is_fallback();
        if fallback_used {
            warn!(session_id = %session_id, "Provider unavailable, storing fallback reply");
        }
        let reply = outcome
            .reply_text()
            .unwrap_or(caller.fallback_message())
            .to_string();

        let assistant_message = self
            .save_message(*session_id, MessageRole::Assistant, reply)
            .await?;

        Ok(ChatTurn {
            user_message,
            assistant_message,
            fallback_used,
        })
    }
}
