//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging, metrics and the service registry in order
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::util::TryInitError;

use crate::config::{load_config, ConfigError, GatewayConfig};
use crate::http::{GatewayServer, ServerError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::{init_logging, init_metrics};
use crate::registry::{RegistryError, ServiceRegistry};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] TryInitError),

    #[error("Invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("Failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("Service registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Run the gateway process to completion.
pub async fn run(config_path: Option<&Path>) -> Result<(), StartupError> {
    let config = load_config(config_path)?;
    init_logging(&config.observability, config.is_production())?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        bind_address = %config.listener.bind_address,
        "keyward starting"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        init_metrics(addr)?;
    }

    let registry = ServiceRegistry::from_env()?;
    if registry.is_empty() {
        tracing::warn!("No services configured; every proxy call will be rejected");
    }
    tracing::info!(services = ?registry.list_services(), "Services configured");
    log_perimeter(&config);

    let address = config.listener.bind_address.clone();
    let server = GatewayServer::new(config, registry)?;
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let shutdown = Shutdown::new();
    let listener_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, listener_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn log_perimeter(config: &GatewayConfig) {
    let limits = &config.rate_limit;
    tracing::info!(
        enabled = limits.enabled,
        general = format_args!("{} requests/{}s per IP", limits.general.max_requests, limits.general.window_secs),
        proxy = format_args!("{} requests/{}s per IP", limits.proxy.max_requests, limits.proxy.window_secs),
        "Rate limiting"
    );
    tracing::info!(
        cache_enabled = config.cache.enabled,
        cache_ttl_secs = config.cache.ttl_secs,
        security_headers = config.security.enable_headers,
        enforce_origin = config.cors.enforce_origin,
        allowed_origins = ?config.cors.allowed_origins,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Perimeter configured"
    );
}
