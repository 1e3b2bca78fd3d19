//! Crate-wide error type.

use thiserror::Error;

use crate::config::loader::ConfigError;

/// Errors surfaced by the instrumentation stages.
///
/// None of these ever fail a request on their own: request body errors are
/// logged and forwarded, response body errors land in the response log entry,
/// and a handler panic is converted into the fixed 500 response by the
/// recovery stage.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A downstream handler panicked.
    #[error("handler panicked: {0}")]
    HandlerPanic(String),

    /// The inbound body could not be read in full.
    #[error("failed to read body: {0}")]
    Body(#[from] axum::Error),

    /// The outbound body stream yielded an error; the client sees it too.
    #[error("response body failed: {0}")]
    ResponseBody(String),

    /// The outbound body was dropped before its last chunk, usually because
    /// the client went away.
    #[error("response body dropped before completion")]
    ResponseAborted,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TelemetryError {
    /// Build a [`TelemetryError::HandlerPanic`] from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        TelemetryError::HandlerPanic(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payload_str() {
        let err = TelemetryError::from_panic(Box::new("boom"));
        assert_eq!(err.to_string(), "handler panicked: boom");
    }

    #[test]
    fn panic_payload_string() {
        let err = TelemetryError::from_panic(Box::new(format!("bad {}", 42)));
        assert_eq!(err.to_string(), "handler panicked: bad 42");
    }

    #[test]
    fn panic_payload_other() {
        let err = TelemetryError::from_panic(Box::new(7u32));
        assert!(matches!(err, TelemetryError::HandlerPanic(ref m) if m == "unknown panic payload"));
    }
}
