//! Bounded retry with a non-decreasing backoff curve.

use std::time::Duration;

use ragchat_types::llm::LlmError;
use ragchat_types::resilience::{BackoffKind, RetryConfig};

/// Stateless retry policy for the provider call.
///
/// `attempt` is 1-based everywhere: the first execution is attempt 1.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Total attempts allowed, including the first. Never less than one.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Whether another attempt may follow the failed `attempt`.
    ///
    /// Every provider failure is considered transient; the breaker is what
    /// stops retrying against a provider that is down.
    pub fn should_retry(&self, attempt: u32, _error: &LlmError) -> bool {
        attempt < self.max_attempts()
    }

    /// Delay to wait after the failed `attempt` before the next one.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_ms;
        let step = attempt.max(1);
        let ms = match self.config.backoff {
            BackoffKind::Fixed => base,
            BackoffKind::Linear => base.saturating_mul(u64::from(step)),
            BackoffKind::Exponential => {
                let factor = 1u64.checked_shl(step - 1).unwrap_or(u64::MAX);
                base.saturating_mul(factor)
            }
        };
        Duration::from_millis(ms.min(self.config.max_backoff_ms.max(base)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
