//! Resilient outbound calls.
//!
//! - `CircuitBreaker`: closed/open/half-open state shared by all callers
//! - `RetryPolicy`: attempt budget and backoff curve
//! - `ResilientCaller`: composes both around an `LlmProvider` and substitutes
//!   a fallback reply when the call cannot complete

pub mod circuit_breaker;
pub mod retry;
pub mod wrapper;

pub use circuit_breaker::{CallPermit, CallReport, CircuitBreaker, TrialId};
pub use retry::RetryPolicy;
pub use wrapper::ResilientCaller;
