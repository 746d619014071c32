//! Application state wiring all services together.
//!
//! Services are generic over repository/provider traits, but AppState pins
//! them to the concrete infra implementations.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ragchat_core::admission::{AdmissionController, KeyedPolicies};
use ragchat_core::chat::service::ChatService;
use ragchat_core::llm::provider::LlmProvider;
use ragchat_core::resilience::{CircuitBreaker, ResilientCaller, RetryPolicy};
use ragchat_infra::config::{provider_api_key, EnvVars};
use ragchat_infra::llm::create_provider;
use ragchat_infra::llm::openai_compat::OpenAiCompatProvider;
use ragchat_infra::sqlite::chat::SqliteChatRepository;
use ragchat_infra::sqlite::pool::DatabasePool;
use ragchat_types::admission::RateLimitPolicy;
use ragchat_types::config::ServiceConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteChatService = ChatService<SqliteChatRepository>;

pub type ConcreteCaller = ResilientCaller<OpenAiCompatProvider>;

/// Limiter keyed by the `X-API-KEY` credential, with per-key overrides.
pub type CredentialLimiter = AdmissionController<KeyedPolicies>;

/// Limiter keyed by client address, one global policy.
pub type OriginLimiter = AdmissionController<RateLimitPolicy>;

/// Shared application state, cloned into every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub caller: Arc<ConcreteCaller>,
    /// Same breaker the caller uses; read by `/health/breaker`.
    pub breaker: Arc<CircuitBreaker>,
    pub credential_limiter: Arc<CredentialLimiter>,
    pub origin_limiter: Arc<OriginLimiter>,
    /// Accepted credentials. Empty means development mode (no check).
    pub api_keys: Arc<HashSet<String>>,
    pub config: Arc<ServiceConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: connect to DB, build the provider
    /// client, wire services.
    pub async fn init(
        data_dir: PathBuf,
        config: ServiceConfig,
        env: &EnvVars,
    ) -> anyhow::Result<Self> {
        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::open(&data_dir).await?;
        let provider = create_provider(&config.provider, provider_api_key(env))?;

        Ok(Self::new(
            config,
            SqliteChatRepository::new(db_pool),
            provider,
            data_dir,
        ))
    }

    /// Wire state from already-built infra parts.
    pub fn new(
        config: ServiceConfig,
        repo: SqliteChatRepository,
        provider: OpenAiCompatProvider,
        data_dir: PathBuf,
    ) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(
            format!("{}-completions", provider.name()),
            config.breaker,
        ));
        let caller = ResilientCaller::new(
            provider,
            Arc::clone(&breaker),
            RetryPolicy::new(config.retry),
            Duration::from_millis(config.provider.timeout_ms),
            config.provider.fallback_message.clone(),
        );

        let credential_limiter =
            AdmissionController::new("api_key", KeyedPolicies::from_config(&config.rate_limit));
        let origin_limiter = AdmissionController::new("origin", config.rate_limit.origin_policy());

        let api_keys = config
            .auth
            .api_keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            chat_service: Arc::new(ChatService::new(repo)),
            caller: Arc::new(caller),
            breaker,
            credential_limiter: Arc::new(credential_limiter),
            origin_limiter: Arc::new(origin_limiter),
            api_keys: Arc::new(api_keys),
            config: Arc::new(config),
            data_dir,
        }
    }

    /// True when no credential allowlist is configured.
    pub fn auth_disabled(&self) -> bool {
        self.api_keys.is_empty()
    }
}
