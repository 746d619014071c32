//! Resolution of the limit/window pair that applies to a key.

use std::collections::HashMap;

use ragchat_types::admission::RateLimitPolicy;
use ragchat_types::config::{RateLimitConfig, RateLimitOverride};

/// Decides which policy a newly seen key gets.
pub trait PolicySource: Send + Sync {
    fn policy_for(&self, key: &str) -> RateLimitPolicy;
}

/// The same policy for every key (used by the origin-keyed limiter).
impl PolicySource for RateLimitPolicy {
    fn policy_for(&self, _key: &str) -> RateLimitPolicy {
        *self
    }
}

/// Per-key overrides on top of a default policy.
///
/// Overrides are looked up by the upper-cased key, so `alpha`, `Alpha`
/// and `ALPHA` share one override entry. Each field of an override falls
/// back to the default independently.
#[derive(Debug, Clone, Default)]
pub struct KeyedPolicies {
    default: RateLimitPolicy,
    overrides: HashMap<String, RateLimitOverride>,
}

impl KeyedPolicies {
    pub fn new(default: RateLimitPolicy) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        let overrides = config
            .overrides
            .iter()
            .map(|(key, ov)| (key.to_uppercase(), *ov))
            .collect();
        Self {
            default: config.default_policy(),
            overrides,
        }
    }

    pub fn with_override(mut self, key: &str, ov: RateLimitOverride) -> Self {
        self.overrides.insert(key.to_uppercase(), ov);
        self
    }

    pub fn default_policy(&self) -> RateLimitPolicy {
        self.default
    }
}

impl PolicySource for KeyedPolicies {
    fn policy_for(&self, key: &str) -> RateLimitPolicy {
        match self.overrides.get(&key.to_uppercase()) {
            Some(ov) => RateLimitPolicy {
                limit: ov.limit.unwrap_or(self.default.limit),
                window_ms: ov.window_ms.unwrap_or(self.default.window_ms),
            },
            None => self.default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_ignores_key() {
        let policy = RateLimitPolicy::new(60, 60_000);
        assert_eq!(policy.policy_for("10.0.0.1"), policy);
    }

    #[test]
    fn override_lookup_is_case_insensitive() {
        let policies = KeyedPolicies::new(RateLimitPolicy::new(5, 60_000)).with_override(
            "alpha",
            RateLimitOverride {
                limit: Some(2),
                window_ms: Some(1000),
            },
        );
        assert_eq!(policies.policy_for("Alpha"), RateLimitPolicy::new(2, 1000));
        assert_eq!(policies.policy_for("beta"), RateLimitPolicy::new(5, 60_000));
    }

    #[test]
    fn partial_override_falls_back_per_field() {
        let policies = KeyedPolicies::new(RateLimitPolicy::new(5, 60_000)).with_override(
            "gamma",
            RateLimitOverride {
                limit: None,
                window_ms: Some(500),
            },
        );
        assert_eq!(policies.policy_for("gamma"), RateLimitPolicy::new(5, 500));
    }

    #[test]
    fn from_config_normalizes_override_keys() {
        let mut config = RateLimitConfig::default();
        config.overrides.insert(
            "mixedCase".to_string(),
            RateLimitOverride {
                limit: Some(9),
                window_ms: None,
            },
        );
        let policies = KeyedPolicies::from_config(&config);
        assert_eq!(policies.policy_for("MIXEDCASE").limit, 9);
    }
}
