//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Logging → Metrics → Registry → Bind → Serve
//!
//! Background (maintenance.rs):
//!     Interval tick → evict idle rate-limit windows and expired cache entries
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, drain, stop background tasks

pub mod maintenance;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use maintenance::Maintenance;
pub use shutdown::{Shutdown, ShutdownListener};
