//! Outbound response logging and metrics.
//!
//! The single point where per-request telemetry converges: the response body
//! streams to the client through a [`CaptureStream`], and once it ends one
//! response entry is logged and one observation is folded into
//! [`Metrics`](crate::observability::Metrics).

use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use std::time::Instant;

use crate::error::TelemetryError;
use crate::http::body::compact_body;
use crate::http::request::{RequestContext, RequestMeta};
use crate::http::response::{CaptureStream, CapturedResponse};
use crate::middleware::Telemetry;
use crate::observability::LogEntry;

pub async fn log_response(
    State(telemetry): State<Telemetry>,
    mut request: Request,
    next: Next,
) -> Response {
    let entered = Instant::now();
    let ctx = RequestContext::attach(&mut request);
    let meta = RequestMeta::from_request(&request);
    let skip_body = meta.method == Method::HEAD;

    let response = next.run(request).await;

    let observation = Observation {
        telemetry,
        ctx,
        meta,
        entered,
    };

    // Nothing to stream: hyper may never poll such a body, so report now.
    if skip_body || response.body().is_end_stream() {
        let captured = CapturedResponse {
            status: Some(response.status()),
            body: Bytes::new(),
        };
        observation.finish(captured, None);
        return response;
    }

    CaptureStream::wrap(
        response,
        Box::new(move |captured, error| observation.finish(captured, error)),
    )
}

/// Everything needed to report a response after its body is done.
struct Observation {
    telemetry: Telemetry,
    ctx: RequestContext,
    meta: RequestMeta,
    entered: Instant,
}

impl Observation {
    fn finish(self, captured: CapturedResponse, error: Option<TelemetryError>) {
        // Without a request-log stage in front, time from when this stage was entered.
        let elapsed = self.ctx.start_time().unwrap_or(self.entered).elapsed();
        let correlation_id = self
            .ctx
            .correlation_id_or_init(|| self.telemetry.next_correlation_id())
            .to_string();
        let status = captured.status.unwrap_or(StatusCode::OK);

        if let Some(err) = &error {
            tracing::warn!(request_id = %correlation_id, path = %self.meta.path, error = %err, "Response body ended early");
        }

        let entry = LogEntry {
            status_code: Some(status),
            method: self.meta.method,
            path: self.meta.path,
            request_body: String::new(),
            response_body: compact_body(&captured.body),
            process_time: elapsed,
            client_ip: self.meta.client_ip,
            user_agent: self.meta.user_agent,
            correlation_id,
            error: error.map(|e| e.to_string()),
        };
        self.telemetry.active_logger().log_response(&entry);
        self.telemetry
            .metrics()
            .record_request(entry.method.as_str(), status.as_u16(), elapsed);
    }
}
