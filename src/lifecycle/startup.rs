//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging, then metrics, then the service
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: configuration, logging and wiring errors are fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)
//! - A metrics exporter that fails to start is logged, not fatal

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::util::TryInitError;

use crate::config::{load_config, validate_config, ConfigError, EdgeConfig};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{init_logging, init_metrics};
use crate::service::{EdgeService, ServiceError};

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub config_path: Option<PathBuf>,
    pub bind_address: Option<String>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] TryInitError),

    #[error("failed to assemble service: {0}")]
    Service(#[from] ServiceError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Resolve the effective configuration.
pub fn resolve_config(options: &StartupOptions) -> Result<EdgeConfig, ConfigError> {
    let mut config = match &options.config_path {
        Some(path) => load_config(path)?,
        None => EdgeConfig::default(),
    };
    if let Some(bind) = &options.bind_address {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

/// Run the edge service until it is asked to stop.
pub async fn run(options: StartupOptions) -> Result<(), StartupError> {
    let config = resolve_config(&options)?;
    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?options.config_path,
        bind_address = %config.listener.bind_address,
        max_concurrent_requests = config.listener.max_concurrent_requests,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let service = EdgeService::build(config)?;

    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address.clone(),
            source,
        })?;
    tracing::info!(
        address = %listener.local_addr().map_err(StartupError::Serve)?,
        "Listening for connections"
    );

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            signals::wait_for_shutdown_signal().await;
            shutdown.trigger();
        }
    });

    service
        .run(listener, server_shutdown)
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = resolve_config(&StartupOptions::default()).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:7676");
    }

    #[test]
    fn test_bind_override() {
        let options = StartupOptions {
            bind_address: Some("127.0.0.1:8181".into()),
            ..Default::default()
        };
        let config = resolve_config(&options).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8181");

        let bad = StartupOptions {
            bind_address: Some("nowhere".into()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_config(&bad),
            Err(ConfigError::Validation(_))
        ));
    }
}
