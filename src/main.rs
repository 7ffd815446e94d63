//! wshub server: WebSocket hub demo
//!
//! Wires configuration, logging, the hub and the HTTP router together.

mod consumer;
mod routes;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt};

use wshub::Hub;
use wshub_core::config::AppConfig;
use wshub_core::{BasicLogger, TracingLogger};

/// Command-line flags.
#[derive(Debug, Parser)]
#[command(name = "wshub-server", version, about = "WebSocket hub demo server")]
struct Cli {
    /// HTTP service address, overrides `server.host` and `server.port`
    #[arg(long)]
    addr: Option<String>,

    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/default")]
    config: String,

    /// Environment overlay loaded from `config/{env}`
    #[arg(long, default_value = "development")]
    env: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config, &cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    let logger: Arc<dyn BasicLogger> = Arc::new(TracingLogger::new("wshub-server"));
    if let Err(e) = run(cli, config, logger.clone()).await {
        logger.fatalf(format_args!("Server error: {e:#}"));
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(cli: Cli, config: AppConfig, logger: Arc<dyn BasicLogger>) -> anyhow::Result<()> {
    tracing::info!("Starting wshub v{}", env!("CARGO_PKG_VERSION"));

    let (control_tx, control_rx) = mpsc::channel(config.hub.control_buffer_size);
    let (inbound_tx, inbound_rx) = mpsc::channel(config.hub.inbound_buffer_size);

    let hub = Hub::builder(config.hub.clone())
        .control(control_tx)
        .inbound(inbound_tx)
        .logger(logger)
        .build()?;
    hub.start()?;

    let control_task = tokio::spawn(consumer::log_control_events(control_rx));
    let inbound_task = tokio::spawn(consumer::handle_client_messages(hub.clone(), inbound_rx));

    let addr = cli.addr.unwrap_or_else(|| config.server.addr());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("wshub listening on {}", addr);

    let shutdown_hub = hub.clone();
    axum::serve(
        listener,
        routes::build_router(hub.clone(), &config.server.static_dir),
    )
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, stopping hub...");
            if let Err(e) = shutdown_hub.stop().await {
                tracing::error!("Hub stop error: {}", e);
            }
        })
        .await
        .context("HTTP server error")?;

    // The inbound consumer holds a hub clone, which keeps both channels open.
    inbound_task.abort();
    let _ = inbound_task.await;
    drop(hub);

    if tokio::time::timeout(Duration::from_secs(5), control_task)
        .await
        .is_err()
    {
        tracing::warn!("Control consumer did not drain in time");
    }

    tracing::info!("wshub stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
