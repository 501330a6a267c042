//! Cross-origin policy.
//!
//! Browsers get the allow-list through [`cors_layer`]. When
//! `cors.enforce_origin` is on, [`enforce_origin`] additionally refuses any
//! request carrying a foreign `Origin`, so non-browser callers cannot spoof
//! their way past the browser-only check.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

/// Build the CORS layer for the configured origins.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
}

/// Allow-list consulted by [`enforce_origin`].
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Arc<HashSet<String>>,
}

impl OriginPolicy {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            allowed: Arc::new(config.allowed_origins.iter().cloned().collect()),
        }
    }

    /// Requests without an `Origin` header are same-origin or non-browser.
    pub fn allows(&self, origin: Option<&HeaderValue>) -> bool {
        match origin {
            None => true,
            Some(value) => value
                .to_str()
                .map(|origin| self.allowed.contains(origin))
                .unwrap_or(false),
        }
    }
}

pub async fn enforce_origin(
    State(policy): State<OriginPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request.headers().get(ORIGIN);
    if policy.allows(origin) {
        return next.run(request).await;
    }

    tracing::warn!(origin = ?origin, "Rejected request from disallowed origin");
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "success": false, "error": "Origin not allowed" })),
    )
        .into_response()
}
