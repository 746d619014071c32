//! HTTP/REST API layer.
//!
//! Axum routes under `/api/chat/` plus operational health endpoints,
//! admission middleware, API key authentication and a uniform
//! `{code, message, data}` envelope.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
