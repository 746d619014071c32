//! HTTP request handlers for the REST API.

pub mod cache;
pub mod chat;
pub mod health;
pub mod message;
pub mod session;
