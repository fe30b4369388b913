//! GridSense - Smart Energy Telemetry Intelligence
//!
//! Streaming energy analytics service: consumes sensor telemetry from an
//! AMQP broker, runs anomaly detection and efficiency scoring per message,
//! and serves the full analytics suite over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Run against a local broker with defaults
//! cargo run --release
//!
//! # Bind the API elsewhere, skip the broker consumer entirely
//! cargo run --release -- --addr 127.0.0.1:9090 --no-ingest
//! ```
//!
//! # Environment Variables
//!
//! - `GRIDSENSE_BROKER_HOST` / `_PORT` / `_USER` / `_PASSWORD` / `_VHOST`
//! - `GRIDSENSE_EXCHANGE`, `GRIDSENSE_SENSOR_QUEUE`, `GRIDSENSE_RESULTS_QUEUE`
//! - `GRIDSENSE_CALLBACK_URL`: callback sink for analysis results
//! - `GRIDSENSE_SERVER_ADDR`: HTTP bind address (default: 0.0.0.0:8080)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use gridsense::api::{create_app, ApiState};
use gridsense::config::ServiceConfig;
use gridsense::dispatch::ResultDispatcher;
use gridsense::engine::AnalyticsEngine;
use gridsense::ingest::{IngestorState, TelemetryIngestor};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "gridsense")]
#[command(about = "GridSense Smart Energy Telemetry Intelligence")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Serve the HTTP API only; never connect to the broker
    #[arg(long)]
    no_ingest: bool,
}

/// Names for the long-running tasks, used in shutdown reporting.
#[derive(Debug)]
enum TaskName {
    Ingestor,
    HttpServer,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config = ServiceConfig::from_env();
    if let Some(addr) = args.addr {
        config.server_addr = addr;
    }

    info!("⚡ GridSense v{} starting", env!("CARGO_PKG_VERSION"));
    info!("   Broker:   {}:{}", config.broker.host, config.broker.port);
    info!("   Exchange: {}", config.broker.exchange);
    info!("   Queues:   {} -> {}", config.broker.sensor_queue, config.broker.results_queue);
    info!("   Callback: {}", config.callback_url);

    let engine = AnalyticsEngine::new();
    let dispatcher =
        Arc::new(ResultDispatcher::new(&config).context("Failed to build result dispatcher")?);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Broker consumer. A dead broker degrades the ingest path; the API
    // keeps serving either way.
    let ingestor = TelemetryIngestor::new(
        config.broker.clone(),
        engine,
        Arc::clone(&dispatcher),
        cancel_token.clone(),
    );
    let ingestor_status = ingestor.status();
    if args.no_ingest {
        info!("Ingest disabled by --no-ingest; serving HTTP API only");
        let mut state = ingestor_status.write().await;
        *state = IngestorState::Degraded;
        drop(state);
    } else {
        task_set.spawn(async move {
            info!("[Ingestor] Task starting");
            ingestor.run().await;
            info!("[Ingestor] Task finished");
            Ok(TaskName::Ingestor)
        });
    }

    // HTTP server
    let app = create_app(ApiState {
        engine,
        ingestor: ingestor_status,
    });
    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;
    info!("✓ HTTP server listening on {}", config.server_addr);

    let server_token = cancel_token.clone();
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;
        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });

    // Wait for tasks. The HTTP server exiting ends the service; the ingestor
    // exiting (degraded) does not.
    while let Some(joined) = task_set.join_next().await {
        match joined {
            Ok(Ok(TaskName::HttpServer)) => {
                info!("HTTP server stopped; shutting down remaining tasks");
                cancel_token.cancel();
            }
            Ok(Ok(TaskName::Ingestor)) => {
                info!("Ingestor task finished; HTTP API continues serving");
            }
            Ok(Err(e)) => {
                error!("Task failed: {e:#}");
                cancel_token.cancel();
            }
            Err(e) => {
                error!("Task panicked: {e}");
                cancel_token.cancel();
            }
        }
    }

    info!("GridSense shutdown complete");
    Ok(())
}
