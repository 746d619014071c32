//! Retry + circuit breaker + fallback around one provider call.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, info_span};

use ragchat_types::llm::{CompletionRequest, LlmError};
use ragchat_types::resilience::{CallOutcome, FallbackReason};

use super::circuit_breaker::{CallReport, CircuitBreaker};
use super::retry::RetryPolicy;
use crate::llm::provider::LlmProvider;

/// Wraps an [`LlmProvider`] with explicit resilience collaborators.
///
/// The breaker is shared (`Arc`) because health endpoints read it too.
pub struct ResilientCaller<P: LlmProvider> {
    provider: P,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    timeout: Duration,
    fallback_message: String,
}

impl<P: LlmProvider> ResilientCaller<P> {
    pub fn new(
        provider: P,
        breaker: Arc<CircuitBreaker>,
        retry: RetryPolicy,
        timeout: Duration,
        fallback_message: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            breaker,
            retry,
            timeout,
            fallback_message: fallback_message.into(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn fallback_message(&self) -> &str {
        &self.fallback_message
    }

    /// Run the request until it succeeds, the retry budget is spent, or the
    /// breaker refuses a permit.
    ///
    /// Never returns [`CallOutcome::Failure`]: every failure path ends in
    /// [`CallOutcome::FallbackUsed`] with the configured fallback text.
    pub async fn invoke(&self, request: &CompletionRequest) -> CallOutcome {
        let span = info_span!(
            "gen_ai.chat",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.temperature = request.temperature,
        );
        self.invoke_inner(request).instrument(span).await
    }

    async fn invoke_inner(&self, request: &CompletionRequest) -> CallOutcome {
        let mut attempt: u32 = 0;
        let mut last_error: Option<LlmError> = None;

        loop {
            let permit = self.breaker.before_call();
            if !permit.is_permitted() {
                tracing::error!(attempt, last_error = ?last_error, "circuit open, using fallback reply");
                return self.fallback(FallbackReason::CircuitOpen { last_error });
            }

            attempt += 1;
            match self.attempt(request).await {
                Ok(text) => {
                    self.breaker.after_call(permit, CallReport::Success);
                    tracing::debug!(attempt, "provider call succeeded");
                    return CallOutcome::Success(text);
                }
                Err(err) => {
                    self.breaker.after_call(permit, CallReport::Failure);
                    tracing::debug!(attempt, error = %err, "provider call failed");

                    if !self.retry.should_retry(attempt, &err) {
                        tracing::error!(attempts = attempt, error = %err, "retries exhausted, using fallback reply");
                        return self.fallback(FallbackReason::RetriesExhausted {
                            attempts: attempt,
                            last_error: err,
                        });
                    }

                    let delay = self.retry.delay(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(err);
                }
            }
        }
    }

    /// Provider call bounded by the timeout, with reply extraction.
    async fn attempt(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_millis() as u64))??;
        response.first_content()
    }

    fn fallback(&self, reason: FallbackReason) -> CallOutcome {
        CallOutcome::FallbackUsed {
            reason,
            message: self.fallback_message.clone(),
        }
    }
}
