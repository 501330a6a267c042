//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, perimeter layers)
//!     → request.rs (request ID, client IP)
//!     → middleware/ (access log)
//!     → cache.rs (GET /api/proxy/services only)
//!     → handlers.rs (health, listing, proxy, 404)
//!     → response.rs (gateway-owned bodies, timestamps)
//!     → Send to client
//! ```

pub mod cache;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, GatewayServer, ServerError};
