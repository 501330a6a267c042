//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `keyward_requests_total` (counter): proxied calls by service, status
//! - `keyward_request_duration_seconds` (histogram): proxied call latency
//! - `keyward_rate_limited_total` (counter): rejections by limiter scope
//! - `keyward_cache_total` (counter): cache lookups by result
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels never carry request data beyond the service name

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "keyward_requests_total";
pub const REQUEST_DURATION: &str = "keyward_request_duration_seconds";
pub const RATE_LIMITED_TOTAL: &str = "keyward_rate_limited_total";
pub const CACHE_TOTAL: &str = "keyward_cache_total";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(REQUESTS_TOTAL, "Proxied requests by service and reply status");
    describe_histogram!(REQUEST_DURATION, Unit::Seconds, "Proxied request latency");
    describe_counter!(RATE_LIMITED_TOTAL, "Requests rejected by a rate limiter");
    describe_counter!(CACHE_TOTAL, "Response cache lookups");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(service: &str, status: u16, start: Instant) {
    counter!(REQUESTS_TOTAL, "service" => service.to_owned(), "status" => status.to_string()).increment(1);
    histogram!(REQUEST_DURATION, "service" => service.to_owned()).record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(scope: &'static str) {
    counter!(RATE_LIMITED_TOTAL, "scope" => scope).increment(1);
}

pub fn record_cache(result: &'static str) {
    counter!(CACHE_TOTAL, "result" => result).increment(1);
}
