//! LLM provider implementations.
//!
//! Contains the concrete implementation of the [`LlmProvider`] trait
//! defined in `ragchat-core`, plus a factory building it from settings.
//!
//! [`LlmProvider`]: ragchat_core::llm::provider::LlmProvider

pub mod openai_compat;

use secrecy::SecretString;

use ragchat_types::config::ProviderSettings;
use ragchat_types::llm::LlmError;

use self::openai_compat::OpenAiCompatProvider;

/// Create the provider client from settings and the resolved bearer key.
///
/// A missing key is not an error here: the service still starts and every
/// chat turn degrades to the fallback reply (the provider answers 401).
pub fn create_provider(
    settings: &ProviderSettings,
    api_key: Option<SecretString>,
) -> Result<OpenAiCompatProvider, LlmError> {
    let key = match api_key {
        Some(key) => key,
        None => {
            tracing::warn!("No provider API key configured; chat replies will use the fallback message");
            SecretString::from(String::new())
        }
    };
    OpenAiCompatProvider::from_settings(key, settings)
}
