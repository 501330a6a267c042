//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (preflight, optional strict origin check)
//!     → rate_limit.rs (general budget on /api/*, strict budget on proxy)
//!     → handler
//! Outgoing response:
//!     → headers.rs (security headers)
//! Everything logged or returned:
//!     → redact.rs (credential masking)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject before any upstream call
//! - One redactor, built from the registry, shared by every writer of text

pub mod cors;
pub mod headers;
pub mod rate_limit;
pub mod redact;

pub use cors::{cors_layer, enforce_origin, OriginPolicy};
pub use headers::security_headers;
pub use rate_limit::{enforce_rate_limit, RateDecision, RateLimiter};
pub use redact::{Redactor, REDACTED};
