//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware wiring)
//!     → request.rs (request context, client metadata)
//!     → body.rs (compact bodies for log entries)
//!     → [handler]
//!     → response.rs (interceptor observes status and streamed body)
//!     → Send to client
//! ```

pub mod body;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, RequestMeta, X_REQUEST_ID};
pub use response::{
    CaptureStream, CapturedResponse, ChunkRelay, ResponseInterceptor, ResponseSink,
};
pub use server::HttpServer;
