//! Request-scoped state and metadata.
//!
//! # Responsibilities
//! - Carry start time and correlation id between the stages of one call
//! - Extract logging-relevant information (client IP, user agent, path)
//! - Detect multipart uploads, whose bodies are never buffered
//!
//! # Design Decisions
//! - The context lives in the request's extensions; every stage calls
//!   [`RequestContext::attach`] and gets the same shared slots
//! - Slots are write-once, so an outer stage can read what an inner stage
//!   recorded even after the request value was moved downstream

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderName, Method, Request};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Header used to echo the correlation id to clients.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

#[derive(Debug, Default)]
struct ContextSlots {
    start_time: OnceLock<Instant>,
    correlation_id: OnceLock<String>,
}

/// Per-call state shared by the middleware stages.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    slots: Arc<ContextSlots>,
}

impl RequestContext {
    /// Return the context stored in `request`, inserting a fresh one if absent.
    pub fn attach<B>(request: &mut Request<B>) -> Self {
        if let Some(ctx) = request.extensions().get::<RequestContext>() {
            return ctx.clone();
        }
        let ctx = RequestContext::default();
        request.extensions_mut().insert(ctx.clone());
        ctx
    }

    /// Record the start of the call. Later calls return the first instant.
    pub fn mark_started(&self) -> Instant {
        *self.slots.start_time.get_or_init(Instant::now)
    }

    pub fn start_time(&self) -> Option<Instant> {
        self.slots.start_time.get().copied()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.slots.correlation_id.get().map(String::as_str)
    }

    /// Return the stored correlation id, generating and storing one if absent.
    pub fn correlation_id_or_init(&self, generate: impl FnOnce() -> String) -> &str {
        self.slots.correlation_id.get_or_init(generate)
    }
}

/// The parts of a request that end up in log entries.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub path: String,
    pub client_ip: String,
    pub user_agent: String,
}

impl RequestMeta {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let headers = request.headers();
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            client_ip: client_ip(headers, peer),
            user_agent: header_str(headers, header::USER_AGENT.as_str()).to_string(),
        }
    }
}

/// Resolve the client address: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the socket peer. Empty when none is known.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = header_str(headers, X_FORWARDED_FOR)
        .split(',')
        .next()
        .map(str::trim)
        .unwrap_or_default();
    if !forwarded.is_empty() {
        return forwarded.to_string();
    }

    let real_ip = header_str(headers, X_REAL_IP).trim();
    if !real_ip.is_empty() {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

/// True for `multipart/form-data` bodies, which are never buffered for logging.
pub fn is_multipart(headers: &HeaderMap) -> bool {
    header_str(headers, header::CONTENT_TYPE.as_str()).starts_with("multipart/form-data")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
