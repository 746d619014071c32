//! Chat session and message management.
//!
//! `ChatRepository` is the persistence port implemented by ragchat-infra;
//! `ChatService` holds the validation rules and the chat turn that calls the
//! provider through the resilient caller. `ChatCache` sits between the two
//! for reads.

pub mod cache;
pub mod repository;
pub mod service;

pub use cache::{CacheStats, ChatCache};
pub use repository::ChatRepository;
pub use service::{ChatService, ChatTurn};
