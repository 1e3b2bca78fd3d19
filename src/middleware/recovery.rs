//! Panic recovery.
//!
//! A panic anywhere below this stage becomes a fixed 500 JSON body carrying
//! the correlation id, and one `log_error` record with the same id.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;

use crate::error::TelemetryError;
use crate::http::request::{RequestContext, X_REQUEST_ID};
use crate::middleware::Telemetry;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error. Please try again later.";

#[derive(Serialize)]
struct InternalErrorBody<'a> {
    message: &'a str,
    request_id: &'a str,
}

pub async fn recover(
    State(telemetry): State<Telemetry>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::attach(&mut request);

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            let error = TelemetryError::from_panic(payload);
            let correlation_id = ctx
                .correlation_id()
                .map(str::to_string)
                .unwrap_or_else(|| telemetry.next_correlation_id());

            telemetry.active_logger().log_error(&correlation_id, &error);
            internal_error_response(&correlation_id, telemetry.echoes_request_id())
        }
    }
}

fn internal_error_response(correlation_id: &str, echo_header: bool) -> Response {
    let body = InternalErrorBody {
        message: INTERNAL_ERROR_MESSAGE,
        request_id: correlation_id,
    };
    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    if echo_header {
        if let Ok(value) = HeaderValue::from_str(correlation_id) {
            response.headers_mut().insert(X_REQUEST_ID.clone(), value);
        }
    }
    response
}
