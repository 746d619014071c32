//! Shared domain types for the RAG chat storage service.
//!
//! Chat sessions and messages, LLM request/response shapes, admission
//! decisions, circuit breaker state, and service configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod admission;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod resilience;
