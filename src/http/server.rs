//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up perimeter middleware (request ID, tracing, logging, CORS,
//!   security headers, body limit, timeout, rate limits, cache)
//! - Bind server to listener and serve until shutdown
//! - Run background maintenance alongside the server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::GatewayConfig;
use crate::http::cache::{cache_get_responses, ResponseCache};
use crate::http::handlers;
use crate::http::middleware::log_requests;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::http::response::handle_panic;
use crate::lifecycle::maintenance::Maintenance;
use crate::lifecycle::shutdown::ShutdownListener;
use crate::proxy::Forwarder;
use crate::registry::ServiceRegistry;
use crate::security::{cors_layer, enforce_origin, enforce_rate_limit, security_headers, OriginPolicy, RateLimiter};

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub forwarder: Arc<Forwarder>,
    pub environment: Arc<str>,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the gateway.
#[derive(Debug)]
pub struct GatewayServer {
    config: GatewayConfig,
    state: AppState,
    general_limiter: Arc<RateLimiter>,
    proxy_limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
}

impl GatewayServer {
    /// Create a new server over `registry`.
    pub fn new(config: GatewayConfig, registry: ServiceRegistry) -> Result<Self, ServerError> {
        let redactor = Arc::new(registry.redactor());
        let forwarder = Forwarder::new(&config.timeouts, &config.upstream, redactor)?;

        let state = AppState {
            registry: Arc::new(registry),
            forwarder: Arc::new(forwarder),
            environment: Arc::from(config.environment.as_str()),
        };

        Ok(Self {
            general_limiter: Arc::new(RateLimiter::new("general", &config.rate_limit.general)),
            proxy_limiter: Arc::new(RateLimiter::new("proxy", &config.rate_limit.proxy)),
            cache: Arc::new(ResponseCache::new(&config.cache)),
            state,
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        let rate_limited = self.config.rate_limit.enabled;

        let mut services = get(handlers::list_services).fallback(handlers::not_found);
        if self.config.cache.enabled {
            services = services.route_layer(from_fn_with_state(self.cache.clone(), cache_get_responses));
        }

        let mut proxy = post(handlers::proxy_request).fallback(handlers::not_found);
        if rate_limited {
            proxy = proxy.route_layer(from_fn_with_state(self.proxy_limiter.clone(), enforce_rate_limit));
        }

        let mut api = Router::new()
            .route("/api/proxy/services", services)
            .route("/api/proxy/{service}", proxy);
        if rate_limited {
            api = api.route_layer(from_fn_with_state(self.general_limiter.clone(), enforce_rate_limit));
        }

        let mut router = Router::new()
            .route("/health", get(handlers::health).fallback(handlers::not_found))
            .merge(api)
            .fallback(handlers::not_found)
            .with_state(self.state.clone())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(self.config.timeouts.request_secs),
            ))
            .layer(RequestBodyLimitLayer::new(self.config.security.max_body_size))
            .layer(DefaultBodyLimit::disable());

        if self.config.cors.enforce_origin {
            router = router.layer(from_fn_with_state(OriginPolicy::new(&self.config.cors), enforce_origin));
        }
        router = router.layer(cors_layer(&self.config.cors));

        if self.config.security.enable_headers {
            for (name, value) in security_headers() {
                router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
            }
        }

        router.layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(from_fn(log_requests)),
        )
    }

    /// Background maintenance over this server's limiters and cache.
    pub fn maintenance(&self) -> Maintenance {
        let mut maintenance = Maintenance::new(Duration::from_secs(self.config.maintenance_interval_secs));
        if self.config.rate_limit.enabled {
            maintenance = maintenance
                .with_limiter(self.general_limiter.clone())
                .with_limiter(self.proxy_limiter.clone());
        }
        if self.config.cache.enabled {
            maintenance = maintenance.with_cache(self.cache.clone());
        }
        maintenance
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownListener) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let maintenance = tokio::spawn(self.maintenance().run(shutdown.clone()));

        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        if let Err(err) = maintenance.await {
            tracing::error!(error = %err, "Maintenance task failed");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Span per request; the query string is deliberately not recorded.
fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = request_id(request).unwrap_or("-"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CredentialLocation, ServiceEntry};
    use axum::body::{to_bytes, Body};
    use axum::http::header::ORIGIN;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn server(config: GatewayConfig) -> GatewayServer {
        let registry = ServiceRegistry::from_entries([ServiceEntry::new(
            "openai",
            "http://127.0.0.1:9/v1",
            CredentialLocation::Header,
            "Authorization",
            "sk-router-secret",
        )
        .unwrap()])
        .unwrap();
        let mut config = config;
        config.upstream.system_proxy = false;
        GatewayServer::new(config, registry).unwrap()
    }

    async fn send(router: Router, request: axum::http::Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> axum::http::Request<Body> {
        axum::http::Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, headers, body) = send(server(GatewayConfig::default()).router(), get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["environment"], "development");
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let request = axum::http::Request::get("/health")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let (_, headers, _) = send(server(GatewayConfig::default()).router(), request).await;
        assert_eq!(headers["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_services_listing_and_cache() {
        let router = server(GatewayConfig::default()).router();

        let (status, headers, body) = send(router.clone(), get("/api/proxy/services")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["services"], json!(["openai"]));
        assert_eq!(headers["x-cache"], "MISS");
        assert_eq!(headers["cache-control"], "max-age=300");
        assert_eq!(headers["ratelimit-limit"], "100");

        let (_, headers, _) = send(router, get("/api/proxy/services")).await;
        assert_eq!(headers["x-cache"], "HIT");
    }

    #[tokio::test]
    async fn test_unknown_route_and_wrong_method() {
        let router = server(GatewayConfig::default()).router();

        let (status, _, body) = send(router.clone(), get("/nope?x=1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Endpoint not found");
        assert_eq!(body["path"], "/nope?x=1");

        let (status, _, body) = send(router, get("/api/proxy/openai")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_service() {
        let (status, _, body) = send(
            server(GatewayConfig::default()).router(),
            post_json("/api/proxy/nope", json!({"endpoint": "/x"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid service: nope. Available services: openai");
    }

    #[tokio::test]
    async fn test_validation_failures() {
        let router = server(GatewayConfig::default()).router();

        let (status, _, body) = send(router.clone(), post_json("/api/proxy/openai", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Endpoint is required");

        let (status, _, body) = send(
            router.clone(),
            post_json("/api/proxy/openai", json!({"endpoint": "/x", "method": "TRACE"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid HTTP method: TRACE");

        let request = axum::http::Request::post("/api/proxy/openai")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _, body) = send(router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Malformed request body"));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let mut config = GatewayConfig::default();
        config.security.max_body_size = 64;
        let padding = "x".repeat(256);

        let (status, _, _) = send(
            server(config).router(),
            post_json("/api/proxy/openai", json!({"endpoint": "/x", "body": padding})),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_strict_origin_enforcement() {
        let mut config = GatewayConfig::default();
        config.cors.enforce_origin = true;
        let router = server(config).router();

        let request = axum::http::Request::get("/health")
            .header(ORIGIN, "https://evil.example")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(router.clone(), request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Origin not allowed");

        let request = axum::http::Request::get("/health")
            .header(ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["access-control-allow-origin"], "http://localhost:3000");
        assert_eq!(headers["access-control-allow-credentials"], "true");
    }

    #[tokio::test]
    async fn test_perimeter_can_be_disabled() {
        let mut config = GatewayConfig::default();
        config.rate_limit.enabled = false;
        config.cache.enabled = false;
        config.security.enable_headers = false;

        let (_, headers, _) = send(server(config).router(), get("/api/proxy/services")).await;
        assert!(!headers.contains_key("x-cache"));
        assert!(!headers.contains_key("ratelimit-limit"));
        assert!(!headers.contains_key("x-frame-options"));
    }
}
