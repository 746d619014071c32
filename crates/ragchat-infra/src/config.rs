//! Service configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.ragchat/` in production)
//! and deserializes it into [`ServiceConfig`], then applies environment
//! overrides on top. A missing or malformed file, or an unusable variable,
//! never stops the service: the affected setting keeps its default and a
//! warning is logged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;

use ragchat_types::config::{RateLimitOverride, ServiceConfig};
use ragchat_types::error::ConfigError;
use ragchat_types::resilience::BackoffKind;

/// Environment variable selecting the data directory.
pub const DATA_DIR_VAR: &str = "RAGCHAT_DATA_DIR";

/// Environment variable holding the provider bearer key.
pub const PROVIDER_KEY_VAR: &str = "GROQ_API_KEY";

const RATE_LIMIT_PREFIX: &str = "RATE_LIMIT_";
const RATE_WINDOW_PREFIX: &str = "RATE_WINDOW_";
const DEFAULT_SUFFIX: &str = "DEFAULT";

/// Snapshot of environment variables.
///
/// Built from the process environment in production and from literal maps
/// in tests.
#[derive(Debug, Clone, Default)]
pub struct EnvVars(HashMap<String, String>);

impl EnvVars {
    pub fn from_process() -> Self {
        Self(std::env::vars().collect())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Data directory: `RAGCHAT_DATA_DIR`, else `~/.ragchat`, else `./.ragchat`.
pub fn resolve_data_dir(env: &EnvVars) -> PathBuf {
    match env.get(DATA_DIR_VAR) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ragchat"),
    }
}

/// Bearer key for the provider, if configured.
pub fn provider_api_key(env: &EnvVars) -> Option<SecretString> {
    env.get(PROVIDER_KEY_VAR)
        .map(|key| SecretString::from(key.trim().to_string()))
}

/// Load `{data_dir}/config.toml`, then apply environment overrides.
pub async fn load_service_config(data_dir: &Path, env: &EnvVars) -> ServiceConfig {
    let mut config = load_file_config(data_dir).await;
    for err in apply_env(&mut config, env) {
        tracing::warn!("Ignoring configuration value: {err}");
    }
    config
}

/// Load `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`ServiceConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_file_config(data_dir: &Path) -> ServiceConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ServiceConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ServiceConfig::default();
        }
    };

    match toml::from_str::<ServiceConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            ServiceConfig::default()
        }
    }
}

/// Overlay environment variables onto `config`.
///
/// Returns one error per variable that could not be used; each of those
/// settings is left unchanged.
pub fn apply_env(config: &mut ServiceConfig, env: &EnvVars) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    // --- rate limits ---
    let rl = &mut config.rate_limit;
    set_parsed(env, "RATE_LIMIT_DEFAULT", &mut rl.default_limit, &mut errors);
    set_parsed(env, "RATE_WINDOW_DEFAULT", &mut rl.default_window_ms, &mut errors);
    set_parsed(env, "ORIGIN_RATE_LIMIT", &mut rl.origin_limit, &mut errors);
    set_parsed(env, "ORIGIN_RATE_WINDOW", &mut rl.origin_window_ms, &mut errors);
    set_parsed(env, "RATE_SWEEP_INTERVAL_MS", &mut rl.sweep_interval_ms, &mut errors);
    set_parsed(env, "RATE_IDLE_MULTIPLIER", &mut rl.idle_multiplier, &mut errors);

    for (name, value) in env.iter() {
        if let Some(key) = override_key(name, RATE_LIMIT_PREFIX) {
            match parse_number::<u32>(name, value) {
                Ok(limit) => rl.overrides.entry(key).or_default().limit = Some(limit),
                Err(e) => errors.push(e),
            }
        } else if let Some(key) = override_key(name, RATE_WINDOW_PREFIX) {
            match parse_number::<u64>(name, value) {
                Ok(window) => rl.overrides.entry(key).or_default().window_ms = Some(window),
                Err(e) => errors.push(e),
            }
        }
    }
    rl.overrides
        .retain(|_, ov: &mut RateLimitOverride| ov.limit.is_some() || ov.window_ms.is_some());

    // --- auth ---
    if let Some(keys) = env.get("API_KEYS") {
        config.auth.api_keys = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
    }

    // --- provider ---
    let provider = &mut config.provider;
    if let Some(url) = env.get("AI_BASE_URL") {
        provider.base_url = url.trim().to_string();
    }
    if let Some(model) = env.get("AI_MODEL") {
        provider.model = model.trim().to_string();
    }
    if let Some(raw) = env.get("AI_TEMPERATURE") {
        match raw.trim().parse::<f64>() {
            Ok(t) if (0.0..=2.0).contains(&t) => provider.temperature = t,
            _ => errors.push(ConfigError::InvalidValue {
                name: "AI_TEMPERATURE".to_string(),
                reason: format!("expected a number between 0 and 2, got '{raw}'"),
            }),
        }
    }
    set_parsed(env, "AI_TIMEOUT_MS", &mut provider.timeout_ms, &mut errors);
    if let Some(message) = env.get("AI_FALLBACK_MESSAGE") {
        provider.fallback_message = message.to_string();
    }

    // --- breaker ---
    set_parsed(env, "AI_BREAKER_FAILURE_THRESHOLD", &mut config.breaker.failure_threshold, &mut errors);
    set_parsed(env, "AI_BREAKER_OPEN_MS", &mut config.breaker.open_ms, &mut errors);

    // --- retry ---
    let retry = &mut config.retry;
    set_parsed(env, "AI_RETRY_MAX_ATTEMPTS", &mut retry.max_attempts, &mut errors);
    set_parsed(env, "AI_RETRY_BACKOFF_MS", &mut retry.backoff_ms, &mut errors);
    set_parsed(env, "AI_RETRY_MAX_BACKOFF_MS", &mut retry.max_backoff_ms, &mut errors);
    if let Some(raw) = env.get("AI_RETRY_BACKOFF") {
        match raw.parse::<BackoffKind>() {
            Ok(kind) => retry.backoff = kind,
            Err(reason) => errors.push(ConfigError::InvalidValue {
                name: "AI_RETRY_BACKOFF".to_string(),
                reason,
            }),
        }
    }

    errors
}

/// `RATE_LIMIT_ALPHA` -> `Some("ALPHA")`; the `DEFAULT` suffix is not a key.
fn override_key(name: &str, prefix: &str) -> Option<String> {
    let key = name.strip_prefix(prefix)?;
    if key.is_empty() || key == DEFAULT_SUFFIX {
        return None;
    }
    Some(key.to_uppercase())
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidNumber {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn set_parsed<T: FromStr>(env: &EnvVars, name: &str, target: &mut T, errors: &mut Vec<ConfigError>) {
    if let Some(raw) = env.get(name) {
        match parse_number(name, raw) {
            Ok(value) => *target = value,
            Err(e) => errors.push(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> EnvVars {
        pairs.iter().copied().collect()
    }

    #[tokio::test]
    async fn load_file_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_file_config(tmp.path()).await;
        assert_eq!(config, ServiceConfig::default());
    }

    #[tokio::test]
    async fn load_file_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[rate_limit]
default_limit = 10

[rate_limit.overrides.ALPHA]
limit = 2

[breaker]
failure_threshold = 3
"#,
        )
        .await
        .unwrap();

        let config = load_file_config(tmp.path()).await;
        assert_eq!(config.rate_limit.default_limit, 10);
        assert_eq!(config.rate_limit.overrides["ALPHA"].limit, Some(2));
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.breaker.open_ms, 30_000);
    }

    #[tokio::test]
    async fn load_file_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();
        assert_eq!(load_file_config(tmp.path()).await, ServiceConfig::default());
    }

    #[test]
    fn redacted_env_config_does_not_print_credentials() {
        let mut config = ServiceConfig::default();
        let errors = apply_env(
            &mut config,
            &env(&[
                ("API_KEYS", "sk-live-secret42"),
                ("RATE_LIMIT_SK-LIVE-SECRET42", "9"),
            ]),
        );
        assert!(errors.is_empty());
        assert!(config.rate_limit.overrides.contains_key("SK-LIVE-SECRET42"));

        let printed = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!printed.to_uppercase().contains("SK-LIVE-SECRET42"), "{printed}");
        assert!(printed.contains(r#""limit":9"#));
    }

    #[test]
    fn env_sets_defaults_and_per_key_overrides() {
        let mut config = ServiceConfig::default();
        let errors = apply_env(
            &mut config,
            &env(&[
                ("RATE_LIMIT_DEFAULT", "7"),
                ("RATE_WINDOW_DEFAULT", "1000"),
                ("RATE_LIMIT_ALPHA", "2"),
                ("RATE_WINDOW_BETA", "500"),
                ("ORIGIN_RATE_LIMIT", "100"),
            ]),
        );
        assert!(errors.is_empty());

        let rl = &config.rate_limit;
        assert_eq!(rl.default_limit, 7);
        assert_eq!(rl.default_window_ms, 1000);
        assert_eq!(rl.origin_limit, 100);
        assert_eq!(
            rl.overrides["ALPHA"],
            RateLimitOverride {
                limit: Some(2),
                window_ms: None
            }
        );
        assert_eq!(rl.overrides["BETA"].window_ms, Some(500));
        assert!(!rl.overrides.contains_key("DEFAULT"));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let mut config = ServiceConfig::default();
        let errors = apply_env(
            &mut config,
            &env(&[
                ("RATE_LIMIT_DEFAULT", "lots"),
                ("RATE_LIMIT_GAMMA", "-1"),
                ("AI_RETRY_MAX_ATTEMPTS", "4"),
            ]),
        );

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::InvalidNumber { name, .. } if name == "RATE_LIMIT_GAMMA"
        )));
        assert_eq!(config.rate_limit.default_limit, 5);
        assert!(!config.rate_limit.overrides.contains_key("GAMMA"));
        assert_eq!(config.retry.max_attempts, 4);
    }

    #[test]
    fn provider_and_resilience_settings_from_env() {
        let mut config = ServiceConfig::default();
        let errors = apply_env(
            &mut config,
            &env(&[
                ("AI_BASE_URL", "http://localhost:9999/v1"),
                ("AI_MODEL", "test-model"),
                ("AI_TEMPERATURE", "0.2"),
                ("AI_TIMEOUT_MS", "2500"),
                ("AI_BREAKER_FAILURE_THRESHOLD", "2"),
                ("AI_BREAKER_OPEN_MS", "1000"),
                ("AI_RETRY_BACKOFF", "exponential"),
                ("API_KEYS", "alpha, beta,,"),
            ]),
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(config.provider.base_url, "http://localhost:9999/v1");
        assert_eq!(config.provider.model, "test-model");
        assert_eq!(config.provider.temperature, 0.2);
        assert_eq!(config.provider.timeout_ms, 2500);
        assert_eq!(config.breaker.failure_threshold, 2);
        assert_eq!(config.breaker.open_ms, 1000);
        assert_eq!(config.retry.backoff, BackoffKind::Exponential);
        assert_eq!(config.auth.api_keys, vec!["alpha", "beta"]);
    }

    #[test]
    fn bad_temperature_and_backoff_are_reported() {
        let mut config = ServiceConfig::default();
        let errors = apply_env(
            &mut config,
            &env(&[("AI_TEMPERATURE", "hot"), ("AI_RETRY_BACKOFF", "random")]),
        );
        assert_eq!(errors.len(), 2);
        assert_eq!(config.provider.temperature, 0.7);
        assert_eq!(config.retry.backoff, BackoffKind::Fixed);
    }

    #[test]
    fn data_dir_prefers_env() {
        let dir = resolve_data_dir(&env(&[(DATA_DIR_VAR, "/srv/ragchat")]));
        assert_eq!(dir, PathBuf::from("/srv/ragchat"));
        assert!(resolve_data_dir(&EnvVars::default()).ends_with(".ragchat"));
    }

    #[test]
    fn blank_provider_key_is_absent() {
        assert!(provider_api_key(&env(&[(PROVIDER_KEY_VAR, "  ")])).is_none());
        assert!(provider_api_key(&env(&[(PROVIDER_KEY_VAR, "gsk_123")])).is_some());
    }
}
