//! OpenAiCompatProvider -- concrete [`LlmProvider`] for OpenAI-style chat
//! completion endpoints (Groq by default).
//!
//! Sends `{model, messages, temperature}` to `{base_url}/chat/completions`
//! with a bearer credential and decodes `{choices:[{message:{content}}]}`.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use ragchat_core::llm::provider::LlmProvider;
use ragchat_types::config::ProviderSettings;
use ragchat_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Longest error body kept in `LlmError::Status`.
const MAX_ERROR_BODY: usize = 512;

/// Chat-completions client for any OpenAI-compatible API.
///
/// Does NOT derive Debug, so the key cannot leak through formatting.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    provider_name: String,
}

impl OpenAiCompatProvider {
    /// Build a provider for `base_url` (without the `/chat/completions` suffix).
    ///
    /// `request_timeout` is a transport-level ceiling; the per-attempt timeout
    /// is enforced by the resilient caller.
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LlmError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            provider_name: "groq".to_string(),
        })
    }

    /// Provider configured from [`ProviderSettings`].
    pub fn from_settings(api_key: SecretString, settings: &ProviderSettings) -> Result<Self, LlmError> {
        // Leave headroom above the per-attempt timeout so the caller's
        // timer always fires first.
        let ceiling = Duration::from_millis(settings.timeout_ms.saturating_mul(2).max(1000));
        Self::new(api_key, settings.base_url.clone(), ceiling)
    }

    /// Override the reported provider name (used in spans and logs).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to read response body: {e}")))?;

        serde_json::from_slice::<CompletionResponse>(&bytes)
            .map_err(|e| LlmError::MalformedResponse(format!("failed to parse response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_types::llm::Message;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "llama-3.1-8b-instant".to_string(),
            messages: vec![Message::user("Hello")],
            temperature: 0.7,
        }
    }

    fn provider(server: &mockito::Server) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(
            SecretString::from("test-key-not-real"),
            format!("{}/openai/v1/", server.url()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let p = OpenAiCompatProvider::new(
            SecretString::from("k"),
            "https://api.groq.com/openai/v1/",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(p.url(), "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(p.name(), "groq");
    }

    #[tokio::test]
    async fn test_complete_sends_bearer_and_parses_choices() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/v1/chat/completions")
            .match_header("authorization", "Bearer test-key-not-real")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "llama-3.1-8b-instant",
                "messages": [{"role": "user", "content": "Hello"}],
                "temperature": 0.7
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":" Hi! "}}]}"#)
            .create_async()
            .await;

        let response = provider(&server).complete(&request()).await.unwrap();
        assert_eq!(response.first_content().unwrap(), "Hi!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_maps_to_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/openai/v1/chat/completions")
            .with_status(503)
            .with_body("upstream overloaded")
            .create_async()
            .await;

        let err = provider(&server).complete(&request()).await.unwrap_err();
        assert_eq!(
            err,
            LlmError::Status {
                status: 503,
                body: "upstream overloaded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/openai/v1/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = provider(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_decode_but_have_no_content() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/openai/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let response = provider(&server).complete(&request()).await.unwrap();
        assert!(matches!(
            response.first_content(),
            Err(LlmError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let p = OpenAiCompatProvider::new(
            SecretString::from("k"),
            "http://127.0.0.1:1",
            Duration::from_secs(2),
        )
        .unwrap();
        assert!(matches!(
            p.complete(&request()).await,
            Err(LlmError::Transport(_))
        ));
    }
}
