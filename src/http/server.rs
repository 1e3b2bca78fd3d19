//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the demo handlers and the snapshot endpoint
//! - Wire up middleware (recovery, request/response logging, timeout)
//! - Bind server to listener
//! - Stop on the shutdown broadcast

use axum::{
    body::Bytes,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ServiceConfig;
use crate::middleware::{instrument, Telemetry};
use crate::observability::Metrics;

/// HTTP server exposing instrumented routes.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    telemetry: Telemetry,
}

impl HttpServer {
    /// Create a server recording into the process-wide metrics.
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_telemetry(config, Telemetry::global())
    }

    /// Create a server with explicit telemetry handles.
    pub fn with_telemetry(config: ServiceConfig, telemetry: Telemetry) -> Self {
        let telemetry = telemetry
            .echo_request_id(config.correlation.response_header)
            .max_body_bytes(config.logging.max_body_bytes)
            .request_timeout(Duration::from_secs(config.timeouts.request_secs));
        let router = Self::build_router(&config, telemetry.clone());
        Self {
            router,
            config,
            telemetry,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, telemetry: Telemetry) -> Router {
        let mut router = Router::new()
            .route("/ping", get(ping))
            .route("/echo", post(echo));

        if config.metrics.endpoint_enabled {
            router = router.route(
                &config.metrics.endpoint_path,
                get(metrics_snapshot).with_state(telemetry.metrics().clone()),
            );
        }

        instrument(router, telemetry)
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for in-process use (e.g. `tower::ServiceExt::oneshot`).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.telemetry.metrics().clone()
    }
}

async fn ping() -> impl IntoResponse {
    Json(json!({ "message": "pong" }))
}

async fn echo(body: Bytes) -> Bytes {
    body
}

async fn metrics_snapshot(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    Json(metrics.snapshot())
}
