//! Circuit breaker, retry, and resilient-call outcome types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::llm::LlmError;

/// Circuit breaker state for the protected provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation. Calls pass through.
    Closed,
    /// Calls are short-circuited until the open duration elapses.
    Open,
    /// One trial call is allowed through to test recovery.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Point-in-time view of a circuit breaker, for health endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Monotonic milliseconds of the last state transition.
    pub last_transition_ms: u64,
    /// True while a half-open trial call is outstanding.
    pub trial_in_flight: bool,
    /// Calls reported as successful since startup.
    pub total_successes: u64,
    /// Calls reported as failed since startup.
    pub total_failures: u64,
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the breaker.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing a trial call.
    #[serde(default = "default_open_ms")]
    pub open_ms: u64,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_open_ms() -> u64 {
    30_000
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            open_ms: default_open_ms(),
        }
    }
}

/// Shape of the delay curve between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every retry.
    Fixed,
    /// Delay grows by the base amount per attempt.
    Linear,
    /// Delay doubles per attempt.
    Exponential,
}

impl std::str::FromStr for BackoffKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(BackoffKind::Fixed),
            "linear" => Ok(BackoffKind::Linear),
            "exponential" => Ok(BackoffKind::Exponential),
            other => Err(format!("invalid backoff kind: '{other}'")),
        }
    }
}

/// Retry tuning for the provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds. Zero retries immediately.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_backoff_kind")]
    pub backoff: BackoffKind,
    /// Upper bound for any single delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_backoff_kind() -> BackoffKind {
    BackoffKind::Fixed
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            backoff: default_backoff_kind(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Why a resilient call returned the degraded fallback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The breaker refused a permit. Carries the previous attempt's error
    /// when the refusal happened between retries.
    CircuitOpen { last_error: Option<LlmError> },
    /// Every permitted attempt failed.
    RetriesExhausted { attempts: u32, last_error: LlmError },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::CircuitOpen { last_error: None } => write!(f, "circuit-open"),
            FallbackReason::CircuitOpen {
                last_error: Some(err),
            } => write!(f, "circuit-open (last error: {err})"),
            FallbackReason::RetriesExhausted {
                attempts,
                last_error,
            } => write!(f, "retries exhausted after {attempts} attempt(s): {last_error}"),
        }
    }
}

/// Result of one resilient provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The provider answered; carries the extracted reply text.
    Success(String),
    /// A single attempt failed. Never returned by the retrying entry point.
    Failure(LlmError),
    /// The call could not complete; `message` is the degraded reply.
    FallbackUsed {
        reason: FallbackReason,
        message: String,
    },
}

impl CallOutcome {
    /// Reply text to persist for the conversation turn, if any.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            CallOutcome::Success(text) => Some(text),
            CallOutcome::FallbackUsed { message, .. } => Some(message),
            CallOutcome::Failure(_) => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CallOutcome::FallbackUsed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "closed");
        assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
    }

    #[test]
    fn test_fallback_reason_display() {
        let reason = FallbackReason::CircuitOpen { last_error: None };
        assert_eq!(reason.to_string(), "circuit-open");

        let reason = FallbackReason::RetriesExhausted {
            attempts: 3,
            last_error: LlmError::Timeout(100),
        };
        assert!(reason.to_string().contains("3 attempt"));
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(CallOutcome::Success("ok".into()).reply_text(), Some("ok"));
        assert_eq!(
            CallOutcome::Failure(LlmError::CircuitOpen).reply_text(),
            None
        );
        let fallback = CallOutcome::FallbackUsed {
            reason: FallbackReason::CircuitOpen { last_error: None },
            message: "down".into(),
        };
        assert!(fallback.is_fallback());
        assert_eq!(fallback.reply_text(), Some("down"));
    }

    #[test]
    fn test_backoff_kind_parse() {
        assert_eq!("Linear".parse::<BackoffKind>().unwrap(), BackoffKind::Linear);
        assert!("curvy".parse::<BackoffKind>().is_err());
    }
}
