//! Request admission types: per-key rate limit policy and the decision
//! returned for each inbound request.

use serde::{Deserialize, Serialize};

/// Limit and window length applied to one rate-limit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum permitted requests per window.
    pub limit: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl RateLimitPolicy {
    pub const fn new(limit: u32, window_ms: u64) -> Self {
        Self { limit, window_ms }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(5, 60_000)
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    /// Configured limit for the key.
    pub limit: u32,
    /// Quota left in the current window after this request.
    pub remaining: u32,
    /// Milliseconds until the current window resets. Zero when allowed.
    pub retry_after_ms: u64,
}

impl Decision {
    /// Whole seconds to wait, as shown to callers (`retry_after_ms / 1000`).
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after_ms / 1000
    }
}
