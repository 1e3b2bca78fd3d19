//! Request instrumentation middleware.
//!
//! # Data Flow
//! ```text
//! Client Request
//!     → recovery.rs      (fault boundary around everything below)
//!     → request_log.rs   (start time, correlation id, inbound body log)
//!     → response_log.rs  (interceptor, outbound log, metrics)
//!     → timeout          (optional; a 408 still flows back through the stages)
//!     → handler
//! ```
//!
//! Stages share per-call state through [`RequestContext`](crate::http::RequestContext)
//! and process-wide state through a [`Telemetry`] handle.

pub mod recovery;
pub mod request_log;
pub mod response_log;

use axum::middleware::from_fn_with_state;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;

use crate::observability::correlation::{self, CorrelationIdSource};
use crate::observability::logger::{self, Logger};
use crate::observability::metrics::{self, Metrics};

pub use recovery::recover;
pub use request_log::log_request;
pub use response_log::log_response;

/// Largest request body buffered for logging unless configured otherwise.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared handles used by the middleware stages.
///
/// A stage without an explicit logger or id source resolves the process-wide
/// one on every call, so [`set_logger`](crate::observability::set_logger)
/// affects already-built routers.
#[derive(Clone)]
pub struct Telemetry {
    metrics: Arc<Metrics>,
    logger: Option<Arc<dyn Logger>>,
    ids: Option<Arc<dyn CorrelationIdSource>>,
    echo_request_id: bool,
    max_body_bytes: usize,
    request_timeout: Option<Duration>,
}

impl Telemetry {
    /// Process-wide metrics, logger and id source.
    pub fn global() -> Self {
        Self::with_metrics(metrics::global())
    }

    /// Private metrics, process-wide logger and id source.
    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            logger: None,
            ids: None,
            echo_request_id: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            request_timeout: None,
        }
    }

    pub fn logger<L: Logger + 'static>(mut self, logger: L) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn correlation_ids<C: CorrelationIdSource + 'static>(mut self, source: C) -> Self {
        self.ids = Some(Arc::new(source));
        self
    }

    /// Whether responses carry the correlation id in `x-request-id`.
    pub fn echo_request_id(mut self, enabled: bool) -> Self {
        self.echo_request_id = enabled;
        self
    }

    /// Request bodies larger than this are forwarded untouched and logged empty.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Bound the handler and the request-body capture by `timeout`.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub(crate) fn active_logger(&self) -> Arc<dyn Logger> {
        self.logger.clone().unwrap_or_else(logger::current)
    }

    pub(crate) fn next_correlation_id(&self) -> String {
        match &self.ids {
            Some(ids) => ids.next_id(),
            None => correlation::current().next_id(),
        }
    }

    pub(crate) fn echoes_request_id(&self) -> bool {
        self.echo_request_id
    }

    pub(crate) fn body_limit(&self) -> usize {
        self.max_body_bytes
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::global()
    }
}

/// Wrap every route of `router` in recovery → request log → response log.
///
/// With a request timeout set, the timeout sits below the response-log stage
/// so that a timed-out call is still logged and counted as a 408.
#[allow(deprecated)]
pub fn instrument<S>(router: Router<S>, telemetry: Telemetry) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = match telemetry.timeout() {
        Some(timeout) => router.layer(TimeoutLayer::new(timeout)),
        None => router,
    };
    router.layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(telemetry.clone(), recover))
            .layer(from_fn_with_state(telemetry.clone(), log_request))
            .layer(from_fn_with_state(telemetry, log_response)),
    )
}
