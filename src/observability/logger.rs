//! Request/response log sink.
//!
//! The middleware stages never talk to `tracing` directly; they hand a
//! [`LogEntry`] to the active [`Logger`]. The default [`TracingLogger`]
//! renders a human-readable message and emits it as a `tracing` event
//! tagged with the correlation id.

use arc_swap::ArcSwap;
use axum::http::{Method, StatusCode};
use serde::Serialize;
use std::error::Error;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

/// One observed request or response.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// `None` for inbound entries, which are logged before a status exists.
    #[serde(serialize_with = "serialize_status")]
    pub status_code: Option<StatusCode>,
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    pub path: String,
    pub request_body: String,
    pub response_body: String,
    pub process_time: Duration,
    pub client_ip: String,
    pub user_agent: String,
    pub correlation_id: String,
    pub error: Option<String>,
}

fn serialize_status<S: serde::Serializer>(
    status: &Option<StatusCode>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match status {
        Some(status) => serializer.serialize_some(&status.as_u16()),
        None => serializer.serialize_none(),
    }
}

fn serialize_method<S: serde::Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(method.as_str())
}

/// Destination for request, response and error records.
pub trait Logger: Send + Sync {
    fn log_request(&self, entry: &LogEntry);
    fn log_response(&self, entry: &LogEntry);
    fn log_error(&self, correlation_id: &str, error: &dyn Error);
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log_request(&self, entry: &LogEntry) {
        (**self).log_request(entry)
    }

    fn log_response(&self, entry: &LogEntry) {
        (**self).log_response(entry)
    }

    fn log_error(&self, correlation_id: &str, error: &dyn Error) {
        (**self).log_error(correlation_id, error)
    }
}

/// Default logger: one `tracing` event per entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log_request(&self, entry: &LogEntry) {
        let message = format_entry(entry, "Request", &entry.request_body);
        tracing::info!(request_id = %entry.correlation_id, "[REQUEST] {}", message);
    }

    fn log_response(&self, entry: &LogEntry) {
        let message = format_entry(entry, "Response", &entry.response_body);
        tracing::info!(request_id = %entry.correlation_id, "[RESPONSE] {}", message);
    }

    fn log_error(&self, correlation_id: &str, error: &dyn Error) {
        tracing::error!(request_id = %correlation_id, "[ERROR] {}", error);
    }
}

/// Render the multi-line message used by [`TracingLogger`].
pub fn format_entry(entry: &LogEntry, label: &str, body: &str) -> String {
    let status = entry
        .status_code
        .map(|s| s.as_u16().to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut message = format!(
        "{} {} - {} in {}\nClientIP: {}, UserAgent: {}\n{}: {}",
        entry.method,
        entry.path,
        status,
        format_duration(entry.process_time),
        entry.client_ip,
        entry.user_agent,
        label,
        body,
    );
    if let Some(error) = &entry.error {
        message.push_str("\nError: ");
        message.push_str(error);
    }
    message
}

/// Format a duration as milliseconds with two decimals, e.g. `1.25ms`.
pub fn format_duration(d: Duration) -> String {
    format!("{:.2}ms", d.as_micros() as f64 / 1000.0)
}

struct ActiveLogger(Arc<dyn Logger>);

static ACTIVE: LazyLock<ArcSwap<ActiveLogger>> =
    LazyLock::new(|| ArcSwap::from_pointee(ActiveLogger(Arc::new(TracingLogger))));

/// Replace the process-wide logger.
///
/// Requests already holding the previous logger finish with it.
pub fn set_logger<L: Logger + 'static>(logger: L) {
    ACTIVE.store(Arc::new(ActiveLogger(Arc::new(logger))));
}

/// The process-wide logger.
pub fn current() -> Arc<dyn Logger> {
    ACTIVE.load().0.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> LogEntry {
        LogEntry {
            status_code: Some(StatusCode::OK),
            method: Method::GET,
            path: "/ping".into(),
            request_body: String::new(),
            response_body: r#"{"message":"pong"}"#.into(),
            process_time: Duration::from_micros(1_250),
            client_ip: "10.0.0.1".into(),
            user_agent: "curl/8.0".into(),
            correlation_id: "abc".into(),
            error: None,
        }
    }

    #[test]
    fn duration_format() {
        assert_eq!(format_duration(Duration::from_micros(1_250)), "1.25ms");
        assert_eq!(format_duration(Duration::ZERO), "0.00ms");
        assert_eq!(format_duration(Duration::from_secs(2)), "2000.00ms");
    }

    #[test]
    fn response_message() {
        let e = entry();
        let message = format_entry(&e, "Response", &e.response_body);
        assert_eq!(
            message,
            "GET /ping - 200 in 1.25ms\nClientIP: 10.0.0.1, UserAgent: curl/8.0\nResponse: {\"message\":\"pong\"}"
        );
    }

    #[test]
    fn request_message_without_status() {
        let mut e = entry();
        e.status_code = None;
        let message = format_entry(&e, "Request", &e.request_body);
        assert!(message.starts_with("GET /ping - - in"));
    }

    #[test]
    fn error_is_appended() {
        let mut e = entry();
        e.error = Some("failed to read body: reset".into());
        let message = format_entry(&e, "Response", &e.response_body);
        assert!(message.ends_with("\nError: failed to read body: reset"));
    }

    #[test]
    fn entry_serializes_status_as_number() {
        let json = serde_json::to_value(entry()).unwrap();
        assert_eq!(json["status_code"], 200);
        assert_eq!(json["method"], "GET");
    }
}
