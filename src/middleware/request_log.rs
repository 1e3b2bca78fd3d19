//! Inbound request logging.
//!
//! The body is buffered for the log entry only while it stays under the
//! capture limit and arrives before the request timeout. Otherwise whatever
//! was read is stitched back in front of the unread remainder and the body
//! is logged empty, so downstream always sees the complete, original stream.

use axum::{
    body::{Body, BodyDataStream, HttpBody},
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use bytes::{Bytes, BytesMut};
use futures_util::{stream, StreamExt};

use crate::error::TelemetryError;
use crate::http::body::compact_body;
use crate::http::request::{is_multipart, RequestContext, RequestMeta, X_REQUEST_ID};
use crate::middleware::Telemetry;
use crate::observability::LogEntry;

/// Stamp the call with a start time and correlation id, log the inbound
/// body, then always continue down the chain.
///
/// Multipart bodies, and bodies whose declared size is over the capture
/// limit, are left untouched and logged as empty.
pub async fn log_request(
    State(telemetry): State<Telemetry>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::attach(&mut request);
    let start = ctx.mark_started();
    let correlation_id = ctx
        .correlation_id_or_init(|| telemetry.next_correlation_id())
        .to_string();
    let meta = RequestMeta::from_request(&request);

    let mut request_body = String::new();
    if !is_multipart(request.headers()) && !declared_over_limit(&request, telemetry.body_limit()) {
        let (parts, body) = request.into_parts();
        let (captured, body) = capture_body(body, &telemetry, &correlation_id).await;
        if let Some(bytes) = captured {
            request_body = compact_body(&bytes);
        }
        request = Request::from_parts(parts, body);
    }

    let entry = LogEntry {
        status_code: None,
        method: meta.method,
        path: meta.path,
        request_body,
        response_body: String::new(),
        process_time: start.elapsed(),
        client_ip: meta.client_ip,
        user_agent: meta.user_agent,
        correlation_id: correlation_id.clone(),
        error: None,
    };
    telemetry.active_logger().log_request(&entry);

    let mut response = next.run(request).await;

    if telemetry.echoes_request_id() {
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            response.headers_mut().insert(X_REQUEST_ID.clone(), value);
        }
    }
    response
}

/// True when `Content-Length` or the body's own size hint already exceeds `limit`.
fn declared_over_limit(request: &Request, limit: usize) -> bool {
    let limit = u64::try_from(limit).unwrap_or(u64::MAX);
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    declared.is_some_and(|len| len > limit) || request.body().size_hint().lower() > limit
}

enum Fill {
    Complete,
    Overflow(Bytes),
    Failed(axum::Error),
}

async fn fill(frames: &mut BodyDataStream, buf: &mut BytesMut, limit: usize) -> Fill {
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(chunk) if buf.len() + chunk.len() <= limit => buf.extend_from_slice(&chunk),
            Ok(chunk) => return Fill::Overflow(chunk),
            Err(err) => return Fill::Failed(err),
        }
    }
    Fill::Complete
}

/// Read `body` for logging. Returns the captured bytes, if the whole body
/// was captured, and the body to hand downstream.
async fn capture_body(
    body: Body,
    telemetry: &Telemetry,
    correlation_id: &str,
) -> (Option<Bytes>, Body) {
    let mut frames = body.into_data_stream();
    let mut buf = BytesMut::new();

    let filled = fill(&mut frames, &mut buf, telemetry.body_limit());
    let outcome = match telemetry.timeout() {
        Some(timeout) => tokio::time::timeout(timeout, filled).await.ok(),
        None => Some(filled.await),
    };
    let prefix = buf.freeze();

    match outcome {
        Some(Fill::Complete) => (Some(prefix.clone()), Body::from(prefix)),
        Some(Fill::Overflow(chunk)) => {
            tracing::debug!(
                request_id = %correlation_id,
                limit = telemetry.body_limit(),
                "Request body over capture limit; not logged"
            );
            (None, resume(vec![Ok(prefix), Ok(chunk)], frames))
        }
        Some(Fill::Failed(err)) => {
            let err = TelemetryError::from(err);
            tracing::warn!(
                request_id = %correlation_id,
                error = %err,
                "Request body could not be buffered; forwarding what was read"
            );
            (None, resume(vec![Ok(prefix), Err(axum::Error::new(err))], frames))
        }
        None => {
            tracing::warn!(
                request_id = %correlation_id,
                "Request body still incomplete at timeout; not logged"
            );
            (None, resume(vec![Ok(prefix)], frames))
        }
    }
}

/// Put already-read frames back in front of the rest of the stream.
fn resume(head: Vec<Result<Bytes, axum::Error>>, rest: BodyDataStream) -> Body {
    Body::from_stream(stream::iter(head).chain(rest))
}
