//! keyward: a credential-injecting API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//! Client request
//!     → http         (request id, access log, CORS, body limit, rate limits)
//!     → registry     (service name → base URL + credential)
//!     → proxy::request  (validate endpoint, method, params)
//!     → proxy::url      (compose upstream URL)
//!     → proxy::executor (inject credential, one bounded call)  ──▶ upstream API
//!     → proxy::response (uniform envelope)
//! Client response
//!
//! Cross-cutting: config · security · observability · lifecycle
//! ```
//!
//! Clients never hold upstream credentials: the gateway reads them from the
//! environment at startup and attaches them per call.

// Core subsystems
pub mod config;
pub mod http;
pub mod proxy;
pub mod registry;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::{Shutdown, ShutdownListener};
pub use proxy::{ProxyRequest, ProxyResponse};
pub use registry::ServiceRegistry;
