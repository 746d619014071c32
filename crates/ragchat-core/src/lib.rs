//! Business logic and trait definitions for the chat service.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the two concurrency-heavy pieces of
//! the service: per-key request admission and the resilient provider call
//! (retry + circuit breaker + fallback). It depends only on `ragchat-types`
//! -- never on `ragchat-infra` or any database/IO crate.

pub mod admission;
pub mod chat;
pub mod clock;
pub mod llm;
pub mod resilience;
