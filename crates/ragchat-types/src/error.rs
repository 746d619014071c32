use thiserror::Error;

use crate::chat::FieldErrors;

/// Errors related to chat session and message operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    #[error("validation failed")]
    Validation(FieldErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ChatError {
    /// Single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.into());
        ChatError::Validation(errors)
    }
}

/// Errors from repository operations (used by trait definitions in ragchat-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// A configuration value that could not be used.
///
/// Never fatal for the process: the offending setting falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name}: expected a non-negative integer, got '{value}'")]
    InvalidNumber { name: String, value: String },

    #[error("{name}: {reason}")]
    InvalidValue { name: String, reason: String },
}
