//! Security response headers.
//!
//! # Responsibilities
//! - Harden browser handling of every response (CSP, framing, sniffing)
//! - Leave headers a handler set explicitly untouched
//!
//! Applied by the server as one `SetResponseHeaderLayer::if_not_present`
//! per header when `security.enable_headers` is on.

use axum::http::{HeaderName, HeaderValue};

pub const CONTENT_SECURITY_POLICY: &str =
    "default-src 'self'; style-src 'self' 'unsafe-inline'; script-src 'self'; img-src 'self' data: https:";

/// Headers added to every response.
pub fn security_headers() -> Vec<(HeaderName, HeaderValue)> {
    [
        ("content-security-policy", CONTENT_SECURITY_POLICY),
        ("cross-origin-opener-policy", "same-origin"),
        ("cross-origin-resource-policy", "same-origin"),
        ("origin-agent-cluster", "?1"),
        ("referrer-policy", "no-referrer"),
        ("strict-transport-security", "max-age=15552000; includeSubDomains"),
        ("x-content-type-options", "nosniff"),
        ("x-dns-prefetch-control", "off"),
        ("x-download-options", "noopen"),
        ("x-frame-options", "SAMEORIGIN"),
        ("x-permitted-cross-domain-policies", "none"),
        ("x-xss-protection", "0"),
    ]
    .into_iter()
    .map(|(name, value)| (HeaderName::from_static(name), HeaderValue::from_static(value)))
    .collect()
}
