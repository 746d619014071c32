//! Application layer for the RAG chat storage service.
//!
//! Wires the SQLite repository, the resilient provider caller and both
//! admission controllers into an axum router. The `ragchat` binary in
//! `main.rs` drives it.

pub mod http;
pub mod state;
pub mod sweeper;
