//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Middleware stages produce:
//!     → logger.rs (LogEntry → active Logger → tracing event)
//!     → metrics.rs (per-request observation → shared counters)
//!     → correlation.rs (one id per inbound call)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, pretty or JSON)
//!     → snapshot endpoint / shutdown report
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log record of a call
//! - Metrics are cheap (atomic increments, one short lock)
//! - Logger and id source are swappable process-wide handles

pub mod correlation;
pub mod logger;
pub mod logging;
pub mod metrics;

pub use correlation::{set_correlation_id_source, CorrelationIdSource, UuidV4Source};
pub use logger::{set_logger, LogEntry, Logger, TracingLogger};
pub use metrics::{Metrics, MetricsSnapshot};
