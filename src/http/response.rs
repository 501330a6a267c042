//! Gateway-owned response bodies.
//!
//! # Responsibilities
//! - Fixed bodies the gateway produces itself (404, 500, panics)
//! - ISO-8601 timestamps shared by every JSON reply
//!
//! # Design Decisions
//! - Internal failures never carry detail to the client

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

pub const AVAILABLE_ENDPOINTS: [&str; 3] = [
    "GET /health - Health check",
    "GET /api/proxy/services - List available services",
    "POST /api/proxy/{service} - Proxy request to service",
];

/// Current UTC time as `2024-01-01T00:00:00.000Z`.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn internal_error_body() -> Value {
    json!({
        "success": false,
        "error": "Internal server error",
        "timestamp": timestamp(),
    })
}

pub fn not_found_body(path: &str) -> Value {
    json!({
        "success": false,
        "error": "Endpoint not found",
        "path": path,
        "availableEndpoints": AVAILABLE_ENDPOINTS,
    })
}

/// `CatchPanicLayer` handler.
pub fn handle_panic(_panic: Box<dyn Any + Send + 'static>) -> Response {
    // The payload may quote request data, so it is not logged.
    tracing::error!("Request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(internal_error_body())).into_response()
}
