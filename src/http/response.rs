//! Response interception.
//!
//! # Responsibilities
//! - Model the outbound channel as a [`ResponseSink`]: a status line written
//!   once, body chunks written repeatedly
//! - Observe the status and a copy of the body without altering what the
//!   client receives ([`ResponseInterceptor`])
//! - Stream a response body through an interceptor and report once the body
//!   is finished ([`CaptureStream`])
//!
//! # Design Decisions
//! - Chunks reach the client as they are produced; the capture buffer holds
//!   the only extra copy
//! - A body write before any status implies `200 OK`, as in HTTP libraries
//! - Repeated status writes are ignored after the first
//! - Completion is reported exactly once: at end of stream, on a body error,
//!   or when the body is dropped unfinished

use axum::body::{Body, BodyDataStream};
use axum::http::StatusCode;
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use crate::error::TelemetryError;

/// Something that can send a status line once and body chunks repeatedly.
pub trait ResponseSink {
    fn write_header(&mut self, status: StatusCode);
    fn write(&mut self, chunk: Bytes);
}

/// Decorator over a [`ResponseSink`] that records what passes through.
#[derive(Debug)]
pub struct ResponseInterceptor<S: ResponseSink> {
    inner: S,
    captured: BytesMut,
    status: Option<StatusCode>,
}

impl<S: ResponseSink> ResponseInterceptor<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            captured: BytesMut::new(),
            status: None,
        }
    }

    /// The first status written, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Bytes written so far.
    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Release the sink and keep the observations.
    pub fn finish(self) -> (S, CapturedResponse) {
        let captured = CapturedResponse {
            status: self.status,
            body: self.captured.freeze(),
        };
        (self.inner, captured)
    }
}

impl<S: ResponseSink> ResponseSink for ResponseInterceptor<S> {
    fn write_header(&mut self, status: StatusCode) {
        if self.status.is_some() {
            return;
        }
        self.status = Some(status);
        self.inner.write_header(status);
    }

    fn write(&mut self, chunk: Bytes) {
        if self.status.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.captured.extend_from_slice(&chunk);
        self.inner.write(chunk);
    }
}

/// What an interceptor observed. `status` stays `None` if nothing was written.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: Option<StatusCode>,
    pub body: Bytes,
}

/// Sink that hands each written chunk back to the body stream it came from.
#[derive(Debug, Default)]
pub struct ChunkRelay {
    pending: Option<Bytes>,
}

impl ChunkRelay {
    /// The chunk written since the last call.
    pub fn take(&mut self) -> Option<Bytes> {
        self.pending.take()
    }
}

impl ResponseSink for ChunkRelay {
    // The head has already gone out with the response parts.
    fn write_header(&mut self, _status: StatusCode) {}

    fn write(&mut self, chunk: Bytes) {
        self.pending = Some(chunk);
    }
}

/// Called once with the observed response and the error that ended it, if any.
pub type OnComplete = Box<dyn FnOnce(CapturedResponse, Option<TelemetryError>) + Send>;

/// A response body that forwards every chunk through a [`ResponseInterceptor`].
pub struct CaptureStream {
    frames: BodyDataStream,
    pending: Option<(ResponseInterceptor<ChunkRelay>, OnComplete)>,
}

impl CaptureStream {
    pub fn new(body: Body, status: StatusCode, on_complete: OnComplete) -> Self {
        let mut interceptor = ResponseInterceptor::new(ChunkRelay::default());
        interceptor.write_header(status);
        Self {
            frames: body.into_data_stream(),
            pending: Some((interceptor, on_complete)),
        }
    }

    /// Replace the body of `response` with a capturing one. Status and
    /// headers are left as they are.
    pub fn wrap(response: Response, on_complete: OnComplete) -> Response {
        let (parts, body) = response.into_parts();
        let stream = Self::new(body, parts.status, on_complete);
        Response::from_parts(parts, Body::from_stream(stream))
    }

    fn complete(&mut self, error: Option<TelemetryError>) {
        if let Some((interceptor, on_complete)) = self.pending.take() {
            let (_, captured) = interceptor.finish();
            on_complete(captured, error);
        }
    }
}

impl Stream for CaptureStream {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match ready!(self.frames.poll_next_unpin(cx)) {
            Some(Ok(chunk)) => {
                let chunk = match self.pending.as_mut() {
                    Some((interceptor, _)) => {
                        interceptor.write(chunk);
                        interceptor.sink_mut().take().unwrap_or_default()
                    }
                    None => chunk,
                };
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(err)) => {
                self.complete(Some(TelemetryError::ResponseBody(err.to_string())));
                Poll::Ready(Some(Err(err)))
            }
            None => {
                self.complete(None);
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        self.complete(Some(TelemetryError::ResponseAborted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSink {
        headers: Vec<StatusCode>,
        body: Vec<u8>,
    }

    impl ResponseSink for RecordingSink {
        fn write_header(&mut self, status: StatusCode) {
            self.headers.push(status);
        }

        fn write(&mut self, chunk: Bytes) {
            self.body.extend_from_slice(&chunk);
        }
    }

    type Outcome = Arc<Mutex<Vec<(CapturedResponse, Option<String>)>>>;

    fn recorder() -> (Outcome, OnComplete) {
        let outcome = Outcome::default();
        let sink = outcome.clone();
        let on_complete: OnComplete = Box::new(move |captured, error| {
            sink.lock()
                .unwrap()
                .push((captured, error.map(|e| e.to_string())));
        });
        (outcome, on_complete)
    }

    #[test]
    fn write_without_header_implies_ok() {
        let mut interceptor = ResponseInterceptor::new(RecordingSink::default());
        interceptor.write(Bytes::from_static(b"hello"));

        assert_eq!(interceptor.status(), Some(StatusCode::OK));
        let (sink, _) = interceptor.finish();
        assert_eq!(sink.headers, vec![StatusCode::OK]);
    }

    #[test]
    fn first_header_wins() {
        let mut interceptor = ResponseInterceptor::new(RecordingSink::default());
        interceptor.write_header(StatusCode::CREATED);
        interceptor.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        interceptor.write(Bytes::from_static(b"x"));

        let (sink, captured) = interceptor.finish();
        assert_eq!(captured.status, Some(StatusCode::CREATED));
        assert_eq!(sink.headers, vec![StatusCode::CREATED]);
    }

    #[test]
    fn forwards_bytes_in_order() {
        let mut interceptor = ResponseInterceptor::new(RecordingSink::default());
        interceptor.write_header(StatusCode::OK);
        for chunk in ["{\"a\"", ":", "1}"] {
            interceptor.write(Bytes::from_static(chunk.as_bytes()));
        }
        assert_eq!(interceptor.captured(), b"{\"a\":1}");

        let (sink, captured) = interceptor.finish();
        assert_eq!(&captured.body[..], b"{\"a\":1}");
        assert_eq!(sink.body, b"{\"a\":1}");
    }

    #[test]
    fn nothing_written_leaves_status_unset() {
        let (sink, captured) = ResponseInterceptor::new(RecordingSink::default()).finish();
        assert_eq!(captured.status, None);
        assert!(captured.body.is_empty());
        assert!(sink.headers.is_empty());
    }

    #[tokio::test]
    async fn stream_forwards_chunks_and_reports_once() {
        let (outcome, on_complete) = recorder();
        let body = Body::from_stream(stream::iter([
            Ok::<_, std::io::Error>(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
        ]));
        let mut capture = CaptureStream::new(body, StatusCode::ACCEPTED, on_complete);

        assert_eq!(capture.next().await.unwrap().unwrap(), "ab");
        assert!(outcome.lock().unwrap().is_empty());
        assert_eq!(capture.next().await.unwrap().unwrap(), "cd");
        assert!(capture.next().await.is_none());
        drop(capture);

        let outcome = outcome.lock().unwrap();
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome[0].0.status, Some(StatusCode::ACCEPTED));
        assert_eq!(&outcome[0].0.body[..], b"abcd");
        assert_eq!(outcome[0].1, None);
    }

    #[tokio::test]
    async fn dropped_stream_reports_partial_body() {
        let (outcome, on_complete) = recorder();
        let body = Body::from_stream(
            stream::iter([Ok::<_, std::io::Error>(Bytes::from_static(b"partial"))])
                .chain(stream::pending()),
        );
        let mut capture = CaptureStream::new(body, StatusCode::OK, on_complete);
        assert_eq!(capture.next().await.unwrap().unwrap(), "partial");
        drop(capture);

        let outcome = outcome.lock().unwrap();
        assert_eq!(outcome.len(), 1);
        assert_eq!(&outcome[0].0.body[..], b"partial");
        assert_eq!(
            outcome[0].1.as_deref(),
            Some("response body dropped before completion")
        );
    }
}
