//! Axum router configuration with middleware.
//!
//! Chat routes are under `/api/chat/`; `/health` and `/health/breaker` sit
//! at the root. Layers, outermost first: trace, CORS, origin limiter,
//! credential limiter. The API key check runs last, as the
//! [`Authenticated`](crate::http::extractors::auth::Authenticated) extractor
//! on each chat handler.

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::http::middleware::rate_limit::{credential_rate_limit, origin_rate_limit};
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let chat_routes = Router::new()
        // Sessions
        .route("/session", post(handlers::session::create_session))
        .route(
            "/session/{id}",
            get(handlers::session::get_session)
                .put(handlers::session::update_session)
                .delete(handlers::session::delete_session),
        )
        .route("/sessions", get(handlers::session::list_sessions))
        .route(
            "/session/{id}/favorite",
            patch(handlers::session::toggle_favorite),
        )
        // Messages
        .route("/session/{id}/message", post(handlers::message::add_message))
        .route(
            "/session/{id}/messages",
            get(handlers::message::get_messages),
        )
        // Conversation
        .route("/sessions/{id}/chat", post(handlers::chat::chat))
        // Maintenance
        .route("/cache", delete(handlers::cache::clear_caches));

    Router::new()
        .nest("/api/chat", chat_routes)
        .route("/health", get(handlers::health::health_check))
        .route("/health/breaker", get(handlers::health::breaker_health))
        .layer(from_fn_with_state(state.clone(), credential_rate_limit))
        .layer(from_fn_with_state(state.clone(), origin_rate_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
