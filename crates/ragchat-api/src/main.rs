//! RAG chat storage service entry point.
//!
//! Binary name: `ragchat`
//!
//! Parses CLI arguments, resolves configuration from `config.toml` and the
//! environment, then either prints that configuration or starts the REST
//! API server.

mod cli;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use ragchat_api::http::router::build_router;
use ragchat_api::state::AppState;
use ragchat_api::sweeper::Sweeper;
use ragchat_infra::config::{load_service_config, provider_api_key, resolve_data_dir, EnvVars};
use ragchat_observe::{init_tracing, shutdown_tracing, TracingOptions};
use ragchat_types::config::REDACTED;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            otel,
            log_format,
        } => {
            init_tracing(TracingOptions {
                otel,
                format: log_format,
            })
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

            let result = serve(&host, port).await;
            shutdown_tracing();
            result
        }
        Commands::Config => print_config().await,
    }
}

async fn serve(host: &str, port: u16) -> anyhow::Result<()> {
    let env = EnvVars::from_process();
    let data_dir = resolve_data_dir(&env);
    let config = load_service_config(&data_dir, &env).await;

    if config.auth.api_keys.is_empty() {
        tracing::warn!("API_KEYS is empty; API key check disabled (development mode)");
    }

    let state = AppState::init(data_dir, config, &env).await?;
    tracing::info!(data_dir = %state.data_dir.display(), "Application state ready");

    let cancel = CancellationToken::new();
    let sweeper = Sweeper::from_state(&state).spawn(cancel.clone());

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "ragchat API listening");

    let chat_service = Arc::clone(&state.chat_service);
    let router = build_router(state);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cancel.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Rate-limit sweeper ended abnormally");
    }
    chat_service.repo().pool().close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn print_config() -> anyhow::Result<()> {
    let env = EnvVars::from_process();
    let data_dir = resolve_data_dir(&env);
    let config = load_service_config(&data_dir, &env).await;

    let output = json!({
        "data_dir": data_dir.display().to_string(),
        "provider_api_key": provider_api_key(&env).map(|_| REDACTED),
        "config": config.redacted(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
