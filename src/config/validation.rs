//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, budgets > 0)
//! - Check cross-field constraints (upstream timeout within request timeout)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ConfigViolation>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, RatePolicy};

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigViolation {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeouts.upstream_secs ({upstream}) exceeds timeouts.request_secs ({request})")]
    UpstreamExceedsRequest { upstream: u64, request: u64 },

    #[error("rate_limit.{0}.window_secs must be greater than zero")]
    ZeroRateWindow(&'static str),

    #[error("rate_limit.{0}.max_requests must be greater than zero")]
    ZeroRateBudget(&'static str),

    #[error("cache.ttl_secs must be greater than zero when the cache is enabled")]
    ZeroCacheTtl,

    #[error("security.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("upstream.max_response_bytes must be greater than zero")]
    ZeroResponseLimit,

    #[error("cors.allowed_origins entry `{0}` is not a valid header value")]
    InvalidOrigin(String),

    #[error("maintenance_interval_secs must be greater than zero")]
    ZeroMaintenanceInterval,
}

/// Check a configuration, collecting every violation.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ConfigViolation>> {
    let mut violations = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        violations.push(ConfigViolation::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        violations.push(ConfigViolation::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("upstream_secs", timeouts.upstream_secs),
        ("request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            violations.push(ConfigViolation::ZeroTimeout(name));
        }
    }
    if timeouts.upstream_secs > timeouts.request_secs {
        violations.push(ConfigViolation::UpstreamExceedsRequest {
            upstream: timeouts.upstream_secs,
            request: timeouts.request_secs,
        });
    }

    if config.rate_limit.enabled {
        check_policy("general", &config.rate_limit.general, &mut violations);
        check_policy("proxy", &config.rate_limit.proxy, &mut violations);
    }

    if config.cache.enabled && config.cache.ttl_secs == 0 {
        violations.push(ConfigViolation::ZeroCacheTtl);
    }
    if config.security.max_body_size == 0 {
        violations.push(ConfigViolation::ZeroBodyLimit);
    }
    if config.upstream.max_response_bytes == 0 {
        violations.push(ConfigViolation::ZeroResponseLimit);
    }

    for origin in &config.cors.allowed_origins {
        if HeaderValue::from_str(origin).is_err() {
            violations.push(ConfigViolation::InvalidOrigin(origin.clone()));
        }
    }

    if config.maintenance_interval_secs == 0 {
        violations.push(ConfigViolation::ZeroMaintenanceInterval);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check_policy(scope: &'static str, policy: &RatePolicy, violations: &mut Vec<ConfigViolation>) {
    if policy.window_secs == 0 {
        violations.push(ConfigViolation::ZeroRateWindow(scope));
    }
    if policy.max_requests == 0 {
        violations.push(ConfigViolation::ZeroRateBudget(scope));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_violation() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.connect_secs = 0;
        config.timeouts.upstream_secs = 120;
        config.rate_limit.proxy.max_requests = 0;
        config.cors.allowed_origins.push("bad\norigin".into());

        let violations = validate_config(&config).unwrap_err();
        assert_eq!(
            violations,
            vec![
                ConfigViolation::InvalidBindAddress("not-an-address".into()),
                ConfigViolation::ZeroTimeout("connect_secs"),
                ConfigViolation::UpstreamExceedsRequest {
                    upstream: 120,
                    request: 60
                },
                ConfigViolation::ZeroRateBudget("proxy"),
                ConfigViolation::InvalidOrigin("bad\norigin".into()),
            ]
        );
    }

    #[test]
    fn test_disabled_sections_are_not_checked() {
        let mut config = GatewayConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.general.window_secs = 0;
        config.cache.enabled = false;
        config.cache.ttl_secs = 0;
        config.observability.metrics_address = "nowhere".into();

        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_zero_body_limits() {
        let mut config = GatewayConfig::default();
        config.security.max_body_size = 0;
        config.upstream.max_response_bytes = 0;

        assert_eq!(
            validate_config(&config),
            Err(vec![ConfigViolation::ZeroBodyLimit, ConfigViolation::ZeroResponseLimit])
        );
    }
}
