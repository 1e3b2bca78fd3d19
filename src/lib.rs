//! HTTP request instrumentation: panic recovery, request/response logging
//! and lock-free request statistics for axum services.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use request_telemetry::middleware::{instrument, Telemetry};
//!
//! let app = instrument(
//!     Router::new().route("/ping", get(|| async { "pong" })),
//!     Telemetry::global(),
//! );
//! # let _: Router = app;
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;

pub use config::ServiceConfig;
pub use error::TelemetryError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use middleware::{instrument, Telemetry};
pub use observability::{LogEntry, Logger, Metrics, MetricsSnapshot};
