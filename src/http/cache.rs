//! GET response cache.
//!
//! # Responsibilities
//! - Serve repeated GETs for the same path and query from memory
//! - Store only 200 responses, for a fixed TTL
//! - Mark every reply `X-Cache: HIT|MISS` with a matching `Cache-Control`
//!
//! # Design Decisions
//! - Concurrent map (DashMap); entries are cloned out, never held across awaits
//! - Expired entries are dropped on read and by the maintenance task
//! - Bodies without a known size within `max_body_bytes` pass through uncached

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    http::{header::CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;

use crate::config::CacheConfig;
use crate::http::response::internal_error_body;
use crate::observability::metrics;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

#[derive(Debug, Clone)]
struct CachedResponse {
    headers: HeaderMap,
    body: Bytes,
    stored_at: Instant,
}

/// In-memory store of successful GET responses.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    max_body_bytes: usize,
    entries: DashMap<String, CachedResponse>,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.ttl_secs),
            max_body_bytes: config.max_body_bytes,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_fresh(&self, entry: &CachedResponse, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) < self.ttl
    }

    fn lookup_at(&self, key: &str, now: Instant) -> Option<CachedResponse> {
        let hit = self
            .entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.value().clone());
        if hit.is_none() {
            self.entries.remove_if(key, |_, entry| !self.is_fresh(entry, now));
        }
        hit
    }

    fn store_at(&self, key: String, headers: HeaderMap, body: Bytes, now: Instant) {
        self.entries.insert(
            key,
            CachedResponse {
                headers,
                body,
                stored_at: now,
            },
        );
    }

    /// Drop expired entries. Returns how many.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| self.is_fresh(entry, now));
        before.saturating_sub(self.entries.len())
    }

    fn max_age(&self, remaining: Duration) -> HeaderValue {
        HeaderValue::from_str(&format!("max-age={}", remaining.as_secs()))
            .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
    }
}

/// Middleware caching successful GET responses by path and query.
pub async fn cache_get_responses(
    State(cache): State<Arc<ResponseCache>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let now = Instant::now();

    if let Some(hit) = cache.lookup_at(&key, now) {
        metrics::record_cache("hit");
        let remaining = cache.ttl.saturating_sub(now.saturating_duration_since(hit.stored_at));
        let mut response = Response::new(Body::from(hit.body));
        *response.headers_mut() = hit.headers;
        response.headers_mut().insert(X_CACHE, HeaderValue::from_static("HIT"));
        response.headers_mut().insert(CACHE_CONTROL, cache.max_age(remaining));
        return response;
    }

    metrics::record_cache("miss");
    let response = next.run(request).await;
    let cacheable = response.status() == StatusCode::OK
        && response
            .body()
            .size_hint()
            .upper()
            .is_some_and(|size| size <= cache.max_body_bytes as u64);

    let mut response = if cacheable {
        let (parts, body) = response.into_parts();
        match axum::body::to_bytes(body, cache.max_body_bytes).await {
            Ok(bytes) => {
                cache.store_at(key, parts.headers.clone(), bytes.clone(), now);
                Response::from_parts(parts, Body::from(bytes))
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to buffer response for caching");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(internal_error_body())).into_response()
            }
        }
    } else {
        response
    };

    response.headers_mut().insert(X_CACHE, HeaderValue::from_static("MISS"));
    response.headers_mut().insert(CACHE_CONTROL, cache.max_age(cache.ttl));
    response
}
