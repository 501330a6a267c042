//! Sliding-window rate limiting keyed by client IP.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::RatePolicy;
use crate::http::request::client_ip;
use crate::observability::metrics;

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the oldest counted request leaves the window.
    pub reset: Duration,
}

impl RateDecision {
    /// Whole seconds until reset, rounded up.
    pub fn reset_secs(&self) -> u64 {
        let secs = self.reset.as_secs();
        if self.reset.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    /// Write the `RateLimit-*` headers unless an inner limiter already did.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in [
            (RATELIMIT_LIMIT, u64::from(self.limit)),
            (RATELIMIT_REMAINING, u64::from(self.remaining)),
            (RATELIMIT_RESET, self.reset_secs()),
        ] {
            headers.entry(name).or_insert_with(|| HeaderValue::from(value));
        }
    }
}

/// Per-IP request log over a fixed window.
#[derive(Debug)]
pub struct RateLimiter {
    scope: &'static str,
    window: Duration,
    max_requests: u32,
    message: String,
    windows: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(scope: &'static str, policy: &RatePolicy) -> Self {
        Self {
            scope,
            window: Duration::from_secs(policy.window_secs),
            max_requests: policy.max_requests,
            message: policy.message.clone(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Admit or reject one request from `ip`.
    pub fn check(&self, ip: IpAddr) -> RateDecision {
        self.check_at(ip, Instant::now())
    }

    pub fn check_at(&self, ip: IpAddr, now: Instant) -> RateDecision {
        let mut windows = self.lock();
        let log = windows.entry(ip).or_default();

        while let Some(&oldest) = log.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                log.pop_front();
            } else {
                break;
            }
        }

        // Rejected requests are not recorded.
        let allowed = log.len() < self.max_requests as usize;
        if allowed {
            log.push_back(now);
        }

        let reset = log
            .front()
            .map(|&oldest| self.window.saturating_sub(now.saturating_duration_since(oldest)))
            .unwrap_or(self.window);

        RateDecision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(log.len() as u32),
            reset,
        }
    }

    /// Drop clients with no request inside the window. Returns how many.
    pub fn purge_idle(&self) -> usize {
        self.purge_idle_at(Instant::now())
    }

    pub fn purge_idle_at(&self, now: Instant) -> usize {
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, log| {
            log.back()
                .is_some_and(|&newest| now.saturating_duration_since(newest) < self.window)
        });
        before - windows.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<IpAddr, VecDeque<Instant>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Middleware rejecting over-budget clients with 429.
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    let decision = limiter.check(ip);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %ip, scope = limiter.scope(), "Rate limit exceeded");
        metrics::record_rate_limited(limiter.scope());
        let mut rejected = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "success": false, "error": limiter.message() })),
        )
            .into_response();
        rejected
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(decision.reset_secs()));
        rejected
    };

    decision.apply(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn limiter(window_secs: u64, max_requests: u32) -> RateLimiter {
        RateLimiter::new(
            "test",
            &RatePolicy {
                window_secs,
                max_requests,
                message: "slow down".into(),
            },
        )
    }

    const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const OTHER: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    #[test]
    fn test_budget_then_reject() {
        let limiter = limiter(60, 3);
        let now = Instant::now();

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check_at(CLIENT, now);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let rejected = limiter.check_at(CLIENT, now);
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.reset_secs(), 60);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(60, 1);
        let now = Instant::now();

        assert!(limiter.check_at(CLIENT, now).allowed);
        assert!(!limiter.check_at(CLIENT, now).allowed);
        assert!(limiter.check_at(OTHER, now).allowed);
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(10, 2);
        let start = Instant::now();

        assert!(limiter.check_at(CLIENT, start).allowed);
        assert!(limiter.check_at(CLIENT, start + Duration::from_secs(5)).allowed);
        assert!(!limiter.check_at(CLIENT, start + Duration::from_secs(9)).allowed);

        // First request has left the window; second has not.
        let later = limiter.check_at(CLIENT, start + Duration::from_secs(10));
        assert!(later.allowed);
        assert_eq!(later.remaining, 0);
        assert_eq!(later.reset, Duration::from_secs(5));
    }

    #[test]
    fn test_purge_idle() {
        let limiter = limiter(10, 5);
        let start = Instant::now();

        limiter.check_at(CLIENT, start);
        limiter.check_at(OTHER, start + Duration::from_secs(8));
        assert_eq!(limiter.tracked_clients(), 2);

        assert_eq!(limiter.purge_idle_at(start + Duration::from_secs(12)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_headers_keep_inner_values() {
        let mut headers = HeaderMap::new();
        let inner = RateDecision {
            allowed: true,
            limit: 50,
            remaining: 49,
            reset: Duration::from_millis(1500),
        };
        let outer = RateDecision {
            allowed: true,
            limit: 100,
            remaining: 99,
            reset: Duration::from_secs(900),
        };

        inner.apply(&mut headers);
        outer.apply(&mut headers);

        assert_eq!(headers[RATELIMIT_LIMIT], "50");
        assert_eq!(headers[RATELIMIT_REMAINING], "49");
        assert_eq!(headers[RATELIMIT_RESET], "2");
    }
}
