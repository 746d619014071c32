//! CLI command definitions for the `ragchat` binary.

use clap::{Parser, Subcommand};

use ragchat_observe::LogFormat;

/// Chat session storage service with rate limiting and a resilient AI provider call.
#[derive(Parser)]
#[command(name = "ragchat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1", env = "RAGCHAT_HOST")]
        host: String,

        /// Port to listen on.
        #[arg(long, default_value_t = 8080, env = "RAGCHAT_PORT")]
        port: u16,

        /// Export spans through OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,

        /// Log output format: pretty or json.
        #[arg(long, default_value = "pretty", env = "RAGCHAT_LOG_FORMAT")]
        log_format: LogFormat,
    },

    /// Print the resolved configuration as JSON (API keys redacted).
    Config,
}
