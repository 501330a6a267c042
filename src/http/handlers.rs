//! Route handlers.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::response::{not_found_body, timestamp};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::{validate, GatewayError, ProxyResponse, ValidationError};

/// Liveness report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub environment: String,
}

/// Names of the configured services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceList {
    pub services: Vec<String>,
    pub timestamp: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: timestamp(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.environment.to_string(),
    })
}

pub async fn list_services(State(state): State<AppState>) -> Json<ServiceList> {
    Json(ServiceList {
        services: state.registry.list_services(),
        timestamp: timestamp(),
    })
}

/// `POST /api/proxy/{service}`.
///
/// The service is resolved before the body is looked at, so an unknown
/// service wins over a malformed body.
pub async fn proxy_request(
    State(state): State<AppState>,
    Path(service): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<ProxyResponse, GatewayError> {
    let start = Instant::now();

    let Some(entry) = state.registry.lookup(&service) else {
        return Err(GatewayError::UnknownService {
            service,
            available: state.registry.list_services(),
        });
    };

    let Json(raw) = payload.map_err(reject_body)?;
    let request = validate(&raw)?;

    let response = state.forwarder.forward(entry, &request).await;
    metrics::record_request(entry.name(), response.http_status().as_u16(), start);
    Ok(response)
}

fn reject_body(rejection: JsonRejection) -> GatewayError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return GatewayError::PayloadTooLarge;
    }
    ValidationError::MalformedBody(rejection.body_text()).into()
}

pub async fn not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<Value>) {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    (StatusCode::NOT_FOUND, Json(not_found_body(path)))
}
