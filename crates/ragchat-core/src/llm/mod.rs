//! LLM provider abstraction.
//!
//! Only the trait lives here; the HTTP client implementing it is in
//! ragchat-infra.

pub mod provider;

pub use provider::LlmProvider;
