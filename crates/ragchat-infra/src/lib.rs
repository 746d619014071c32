//! Infrastructure layer for ragchat.
//!
//! Contains implementations of the ports defined in `ragchat-core`:
//! SQLite chat storage, the OpenAI-compatible provider client, and the
//! file + environment configuration loader.

pub mod config;
pub mod llm;
pub mod sqlite;
