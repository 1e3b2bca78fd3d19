//! Shared utilities for integration tests.

use axum::body::Body;
use axum::http::{Request, Response};
use request_telemetry::config::ServiceConfig;
use request_telemetry::http::HttpServer;
use request_telemetry::lifecycle::Shutdown;
use request_telemetry::observability::{CorrelationIdSource, LogEntry, Logger, Metrics};
use request_telemetry::Telemetry;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Everything a [`RecordingLogger`] has seen.
#[derive(Debug, Default)]
pub struct Records {
    pub requests: Vec<LogEntry>,
    pub responses: Vec<LogEntry>,
    /// `(correlation_id, error message)`
    pub errors: Vec<(String, String)>,
}

/// Logger that keeps every entry in memory.
#[derive(Clone, Default)]
pub struct RecordingLogger {
    records: Arc<Mutex<Records>>,
}

#[allow(dead_code)]
impl RecordingLogger {
    pub fn requests(&self) -> Vec<LogEntry> {
        self.records.lock().unwrap().requests.clone()
    }

    pub fn responses(&self) -> Vec<LogEntry> {
        self.records.lock().unwrap().responses.clone()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.records.lock().unwrap().errors.clone()
    }
}

impl Logger for RecordingLogger {
    fn log_request(&self, entry: &LogEntry) {
        self.records.lock().unwrap().requests.push(entry.clone());
    }

    fn log_response(&self, entry: &LogEntry) {
        self.records.lock().unwrap().responses.push(entry.clone());
    }

    fn log_error(&self, correlation_id: &str, error: &dyn Error) {
        self.records
            .lock()
            .unwrap()
            .errors
            .push((correlation_id.to_string(), error.to_string()));
    }
}

/// Deterministic ids: `{prefix}-1`, `{prefix}-2`, ...
pub struct SequentialIds {
    prefix: &'static str,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
        }
    }
}

impl CorrelationIdSource for SequentialIds {
    fn next_id(&self) -> String {
        format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Telemetry with private metrics, a recording logger and sequential ids.
#[allow(dead_code)]
pub fn test_telemetry() -> (Telemetry, RecordingLogger, Arc<Metrics>) {
    let logger = RecordingLogger::default();
    let metrics = Arc::new(Metrics::new());
    let telemetry = Telemetry::with_metrics(metrics.clone())
        .logger(logger.clone())
        .correlation_ids(SequentialIds::new("req"));
    (telemetry, logger, metrics)
}

/// Collect a response body as UTF-8 text.
#[allow(dead_code)]
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Start an [`HttpServer`] on an ephemeral port.
#[allow(dead_code)]
pub async fn start_server(
    telemetry: Telemetry,
) -> (SocketAddr, Shutdown, JoinHandle<Result<(), std::io::Error>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = ServiceConfig::default();
    config.listener.bind_address = addr.to_string();

    let server = HttpServer::with_telemetry(config, telemetry);
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
    (addr, shutdown, handle)
}
