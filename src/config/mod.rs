//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults
//!     → optional TOML file (--config / KEYWARD_CONFIG)
//!     → loader.rs (env overrides: PORT, ALLOWED_ORIGINS, KEYWARD_ENV/NODE_ENV)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is read once; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Credentials are not part of the config; the registry reads them directly

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_with, ConfigError};
pub use schema::{
    CacheConfig, CorsConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    RatePolicy, SecurityConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ConfigViolation};
