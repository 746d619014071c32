//! Service configuration types.
//!
//! `ServiceConfig` is deserialized from an optional `config.toml` and then
//! overlaid with environment variables by the infra layer. Every field has
//! a default, so an empty file (or no file) yields a working configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::admission::RateLimitPolicy;
use crate::resilience::{BreakerConfig, RetryConfig};

/// Placeholder shown in place of a credential.
pub const REDACTED: &str = "***";

/// Top-level configuration for the chat service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl ServiceConfig {
    /// Copy safe to print: allowlisted keys become `***` and per-key
    /// overrides are re-keyed `***1`, `***2`, ... since their map keys are
    /// credentials too.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        out.auth.api_keys = vec![REDACTED.to_string(); self.auth.api_keys.len()];

        let mut overrides: Vec<_> = self.rate_limit.overrides.values().copied().collect();
        overrides.sort_by_key(|o| (o.limit, o.window_ms));
        out.rate_limit.overrides = overrides
            .into_iter()
            .enumerate()
            .map(|(i, o)| (format!("{REDACTED}{}", i + 1), o))
            .collect();
        out
    }
}

/// Admission settings for both limiter instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per window for credentials without an override.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Window length for credentials without an override.
    #[serde(default = "default_window_ms")]
    pub default_window_ms: u64,
    /// Requests per window for the origin-keyed (identity-less) limiter.
    #[serde(default = "default_origin_limit")]
    pub origin_limit: u32,
    #[serde(default = "default_window_ms")]
    pub origin_window_ms: u64,
    /// Per-credential overrides, keyed by the upper-cased credential.
    #[serde(default)]
    pub overrides: HashMap<String, RateLimitOverride>,
    /// How often idle windows are swept from the bucket stores.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// A window idle for this many window lengths is evicted.
    #[serde(default = "default_idle_multiplier")]
    pub idle_multiplier: u32,
}

fn default_limit() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_origin_limit() -> u32 {
    60
}

fn default_sweep_interval_ms() -> u64 {
    60_000
}

fn default_idle_multiplier() -> u32 {
    5
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_window_ms: default_window_ms(),
            origin_limit: default_origin_limit(),
            origin_window_ms: default_window_ms(),
            overrides: HashMap::new(),
            sweep_interval_ms: default_sweep_interval_ms(),
            idle_multiplier: default_idle_multiplier(),
        }
    }
}

impl RateLimitConfig {
    /// Policy applied to credentials without an override.
    pub fn default_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.default_limit, self.default_window_ms)
    }

    /// Policy applied by the origin-keyed limiter.
    pub fn origin_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.origin_limit, self.origin_window_ms)
    }
}

/// Per-credential limit and/or window override. Absent fields fall back
/// to the defaults independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitOverride {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub window_ms: Option<u64>,
}

/// Credential allowlist. Empty means development mode (no check).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
}

/// Upstream AI provider settings. The bearer key is supplied separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Per-attempt timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Degraded reply used when the call cannot complete.
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_fallback_message() -> String {
    "AI service is temporarily unavailable. Please try again later.".to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_ms: default_timeout_ms(),
            fallback_message: default_fallback_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.rate_limit.default_policy(), RateLimitPolicy::new(5, 60_000));
        assert_eq!(config.rate_limit.origin_policy().limit, 60);
        assert!(config.auth.api_keys.is_empty());
        assert_eq!(config.provider.model, "llama-3.1-8b-instant");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.breaker.failure_threshold, 5);
    }

    #[test]
    fn test_redacted_hides_keys_and_override_names() {
        let mut config = ServiceConfig::default();
        config.auth.api_keys = vec!["sk-live-secret42".to_string(), "beta-key".to_string()];
        config.rate_limit.overrides.insert(
            "SK-LIVE-SECRET42".to_string(),
            RateLimitOverride {
                limit: Some(9),
                window_ms: None,
            },
        );
        config.rate_limit.overrides.insert(
            "BETA-KEY".to_string(),
            RateLimitOverride {
                limit: None,
                window_ms: Some(1_000),
            },
        );

        let redacted = config.redacted();
        let printed = serde_json::to_string(&redacted).unwrap();
        for secret in ["sk-live-secret42", "SK-LIVE-SECRET42", "beta-key", "BETA-KEY"] {
            assert!(!printed.contains(secret), "{secret} leaked: {printed}");
        }

        assert_eq!(redacted.auth.api_keys, vec!["***", "***"]);
        assert_eq!(redacted.rate_limit.overrides.len(), 2);
        let mut values: Vec<_> = redacted.rate_limit.overrides.values().copied().collect();
        values.sort_by_key(|o| (o.limit, o.window_ms));
        assert!(values.contains(&RateLimitOverride {
            limit: Some(9),
            window_ms: None
        }));
        // The source config keeps its keys.
        assert!(config.rate_limit.overrides.contains_key("SK-LIVE-SECRET42"));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config: ServiceConfig = toml::from_str(
            r#"
[rate_limit]
default_limit = 10

[rate_limit.overrides.ALPHA]
limit = 2

[retry]
backoff = "exponential"
"#,
        )
        .unwrap();
        assert_eq!(config.rate_limit.default_limit, 10);
        assert_eq!(config.rate_limit.default_window_ms, 60_000);
        assert_eq!(config.rate_limit.overrides["ALPHA"].limit, Some(2));
        assert_eq!(config.rate_limit.overrides["ALPHA"].window_ms, None);
        assert_eq!(
            config.retry.backoff,
            crate::resilience::BackoffKind::Exponential
        );
    }
}
