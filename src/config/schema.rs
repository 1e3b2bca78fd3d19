//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::middleware::DEFAULT_MAX_BODY_BYTES;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Log subscriber settings.
    pub logging: LoggingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Metrics read endpoint and shutdown report.
    pub metrics: MetricsConfig,

    /// Correlation id propagation.
    pub correlation: CorrelationConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Request bodies above this size are not buffered for the log entry.
    pub max_body_bytes: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve the JSON snapshot endpoint.
    pub endpoint_enabled: bool,

    /// Path of the snapshot endpoint.
    pub endpoint_path: String,

    /// Print the text report to stdout when the server stops.
    pub print_on_shutdown: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            endpoint_enabled: true,
            endpoint_path: "/metrics".to_string(),
            print_on_shutdown: true,
        }
    }
}

/// Correlation id configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Echo the correlation id in the `x-request-id` response header.
    pub response_header: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            response_header: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.max_body_bytes, 1024 * 1024);
        assert_eq!(config.metrics.endpoint_path, "/metrics");
        assert!(config.correlation.response_header);
    }

    #[test]
    fn partial_sections() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [logging]
            format = "json"
            max_body_bytes = 4096

            [metrics]
            print_on_shutdown = false
            "#,
        )
        .unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.max_body_bytes, 4096);
        assert!(!config.metrics.print_on_shutdown);
        assert!(config.metrics.endpoint_enabled);
    }
}
