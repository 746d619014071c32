//! Observability setup for ragchat.
//!
//! Installs the global `tracing` subscriber (human-readable or JSON lines)
//! and, on request, bridges spans to OpenTelemetry. Provider call spans
//! emitted elsewhere carry GenAI semantic-convention field names
//! (`gen_ai.operation.name`, `gen_ai.provider.name`, `gen_ai.request.model`).

pub mod tracing_setup;

pub use tracing_setup::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};
