//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! Every section has defaults so an empty file (or no file) is a valid config.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Deployment label ("development", "production", ...).
    pub environment: String,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Outbound client settings.
    pub upstream: UpstreamConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// GET response cache.
    pub cache: CacheConfig,

    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Period of the background eviction task, in seconds.
    pub maintenance_interval_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            environment: "development".to_string(),
            cors: CorsConfig::default(),
            timeouts: TimeoutConfig::default(),
            upstream: UpstreamConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            security: SecurityConfig::default(),
            observability: ObservabilityConfig::default(),
            maintenance_interval_secs: 60,
        }
    }
}

impl GatewayConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the gateway from a browser.
    pub allowed_origins: Vec<String>,

    /// Reject requests whose `Origin` is not allow-listed with 403.
    pub enforce_origin: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string(), "app://.".to_string()],
            enforce_origin: false,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time allowed for one upstream call in seconds.
    pub upstream_secs: u64,

    /// Whole inbound request budget in seconds (504 on expiry).
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Honor `HTTP_PROXY` / `HTTPS_PROXY` for outbound calls.
    pub system_proxy: bool,

    pub user_agent: String,

    /// Largest upstream reply body read into memory, in bytes.
    pub max_response_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            system_proxy: true,
            user_agent: concat!("keyward/", env!("CARGO_PKG_VERSION")).to_string(),
            max_response_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Applied to every `/api/` route.
    pub general: RatePolicy,

    /// Applied additionally to the proxy route.
    pub proxy: RatePolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general: RatePolicy {
                window_secs: 15 * 60,
                max_requests: 100,
                message: "Too many requests from this IP, please try again later.".to_string(),
            },
            proxy: RatePolicy {
                window_secs: 15 * 60,
                max_requests: 50,
                message: "API rate limit exceeded, please try again later.".to_string(),
            },
        }
    }
}

/// One sliding-window budget.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RatePolicy {
    pub window_secs: u64,
    pub max_requests: u32,
    /// Error text returned with 429.
    pub message: String,
}

/// GET response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Time-to-live of a stored response in seconds.
    pub ttl_secs: u64,

    /// Responses larger than this are passed through uncached.
    pub max_body_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
