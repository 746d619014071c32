//! Operational endpoints. Exempt from admission control and auth.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health - Liveness plus database, limiter and cache status. Answers
/// 200 even when the database is down; `database` reports that.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let database = match state.chat_service.repo().pool().ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "database ping failed");
            "unavailable"
        }
    };
    Json(json!({
        "status": "ok",
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
        "rateLimit": {
            "trackedApiKeys": state.credential_limiter.tracked_keys(),
            "trackedOrigins": state.origin_limiter.tracked_keys(),
        },
        "cache": state.chat_service.cache_stats(),
    }))
}

/// GET /health/breaker - Circuit breaker snapshot for the provider call.
pub async fn breaker_health(State(state): State<AppState>) -> Json<Value> {
    let breaker = &state.breaker;
    Json(json!({
        "name": breaker.name(),
        "breaker": breaker.snapshot(),
        "config": breaker.config(),
    }))
}
