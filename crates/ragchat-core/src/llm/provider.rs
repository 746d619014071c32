//! LlmProvider trait definition.
//!
//! Implementations live in ragchat-infra (e.g. `OpenAiCompatProvider`).
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use ragchat_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// A chat-completion backend.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "groq").
    fn name(&self) -> &str;

    /// Send one completion request and return the decoded response body.
    ///
    /// Non-2xx statuses, transport errors and undecodable bodies are errors.
    /// Extracting the reply text (and rejecting empty candidate lists) is the
    /// caller's job.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
