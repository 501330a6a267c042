//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     catalog.rs (known services)
//!     → probe configuration for credentials / base URL overrides
//!     → service.rs (validated ServiceEntry)
//!     → lookup.rs (frozen, shared via Arc)
//!
//! Per request:
//!     service name → registry.lookup → &ServiceEntry | not found
//! ```
//!
//! # Design Decisions
//! - Built once; never mutated while serving
//! - Credentials held as secrets, never printed
//! - Credential placement is a closed enum shared by composer and executor

pub mod catalog;
pub mod lookup;
pub mod service;

pub use catalog::{KnownService, KNOWN_SERVICES};
pub use lookup::ServiceRegistry;
pub use service::{CredentialLocation, RegistryError, ServiceEntry};
