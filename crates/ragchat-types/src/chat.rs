//! Chat session and message types.
//!
//! A session belongs to a single user (identified by a 6-digit `user_id`)
//! and holds an ordered list of messages exchanged with the assistant.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export MessageRole from llm module (it's used in both chat and llm contexts).
pub use crate::llm::MessageRole;

/// Maximum length of a single chat message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Allowed session name length range, in characters.
pub const SESSION_NAME_CHARS: std::ops::RangeInclusive<usize> = 3..=50;

/// Length of a user id (digits only).
pub const USER_ID_DIGITS: usize = 6;

/// A chat session owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single message within a chat session.
///
/// Messages are ordered by `created_at` within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sender: MessageRole,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub favorite: bool,
}

/// Payload for updating a session. The owning user cannot be changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub favorite: bool,
}

/// Payload for adding a message to a session.
///
/// `sender` is kept as raw text so that an unknown role surfaces as a
/// field validation error instead of a body parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub message: String,
}

/// Field name -> human readable violation.
pub type FieldErrors = BTreeMap<String, String>;

impl NewSession {
    /// Check the user id and name constraints.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(msg) = user_id_violation(&self.user_id) {
            errors.insert("userId".to_string(), msg);
        }
        if let Some(msg) = session_name_violation(&self.name) {
            errors.insert("name".to_string(), msg);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl NewMessage {
    /// Check the sender and message constraints, returning the parsed role.
    pub fn validate(&self) -> Result<MessageRole, FieldErrors> {
        let mut errors = FieldErrors::new();

        let role = if self.sender.trim().is_empty() {
            errors.insert("sender".to_string(), "Sender is required".to_string());
            None
        } else {
            match self.sender.as_str() {
                "user" => Some(MessageRole::User),
                "assistant" => Some(MessageRole::Assistant),
                _ => {
                    errors.insert(
                        "sender".to_string(),
                        "Sender must be either 'user' or 'assistant'".to_string(),
                    );
                    None
                }
            }
        };

        if let Some(msg) = message_violation(&self.message) {
            errors.insert("message".to_string(), msg);
        }

        match role {
            Some(role) if errors.is_empty() => Ok(role),
            _ => Err(errors),
        }
    }
}

/// Returns a violation message if `user_id` is not exactly six ASCII digits.
pub fn user_id_violation(user_id: &str) -> Option<String> {
    if user_id.trim().is_empty() {
        return Some("User ID is mandatory".to_string());
    }
    if user_id.chars().count() != USER_ID_DIGITS {
        return Some("User ID must be exactly 6 digits long".to_string());
    }
    if !user_id.chars().all(|c| c.is_ascii_digit()) {
        return Some("User ID must contain only digits".to_string());
    }
    None
}

/// Returns a violation message if `name` is blank or out of range.
pub fn session_name_violation(name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return Some("Session name is required".to_string());
    }
    if !SESSION_NAME_CHARS.contains(&name.chars().count()) {
        return Some("Session name must be between 3 and 50 characters".to_string());
    }
    None
}

/// Returns a violation message if `message` is blank or too long.
pub fn message_violation(message: &str) -> Option<String> {
    if message.trim().is_empty() {
        return Some("Message content cannot be empty".to_string());
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Some("Message cannot exceed 2000 characters".to_string());
    }
    None
}
