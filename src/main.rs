//! Instrumented demo server.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ recovery ─▶ request log ─▶ response log ─▶ timeout ─▶ handler
//!                                                    │
//!                                                    ▼
//!                                           metrics aggregator
//! ```
//!
//! Serves `GET /ping`, `POST /echo` and the JSON snapshot endpoint, and
//! prints the metrics report when it stops.

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use request_telemetry::config::{load_config, ServiceConfig};
use request_telemetry::http::HttpServer;
use request_telemetry::lifecycle::{signals, Shutdown};
use request_telemetry::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "request-telemetry")]
#[command(about = "Instrumented HTTP server with request logging and metrics", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    init_logging(&config.logging)?;
    tracing::info!("request-telemetry v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        metrics_endpoint = config.metrics.endpoint_enabled,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    let print_report = config.metrics.print_on_shutdown;
    let server = HttpServer::new(config);
    let metrics = server.metrics();
    server.run(listener, shutdown.subscribe()).await?;

    if print_report {
        metrics.print_report();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
