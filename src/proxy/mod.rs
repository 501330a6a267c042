//! Proxy core.
//!
//! # Data Flow
//! ```text
//! POST /api/proxy/{service} body
//!     → registry lookup (unknown → 400)
//!     → request.rs (validate → ProxyRequest, else 400)
//!     → url.rs (compose upstream URL)
//!     → executor.rs (inject credential, one bounded call)
//!     → response.rs (ProxyResponse envelope)
//! ```
//!
//! # Design Decisions
//! - No retries: one attempt per client request
//! - Upstream status is echoed in the envelope and in the reply status
//! - Nothing reaches the network until lookup and validation pass

pub mod error;
pub mod executor;
pub mod request;
pub mod response;
pub mod url;

pub use error::GatewayError;
pub use executor::{ForwardError, Forwarder};
pub use request::{validate, ProxyMethod, ProxyRequest, ValidationError};
pub use response::ProxyResponse;
pub use url::compose;
