//! Axum middleware owned by the HTTP layer.

pub mod request_log;

pub use request_log::log_requests;
