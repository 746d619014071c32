//! Custom axum extractors.

pub mod auth;
pub mod request;
