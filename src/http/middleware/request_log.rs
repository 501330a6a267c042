//! Per-request access log.

use axum::{extract::Request, http::header::USER_AGENT, middleware::Next, response::Response};

use crate::http::request::{client_ip, request_id};
use crate::http::response::timestamp;

/// Emit one structured event per inbound request.
///
/// Only the path is logged; query strings are left out.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("Unknown");

    tracing::info!(
        timestamp = %timestamp(),
        method = %request.method(),
        path = %request.uri().path(),
        ip = %client_ip(&request),
        user_agent = %user_agent,
        request_id = request_id(&request).unwrap_or("-"),
        "Incoming request"
    );

    next.run(request).await
}
