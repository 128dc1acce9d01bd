//! Composition root.
//!
//! # Data Flow
//! ```text
//! EdgeConfig
//!     → SecretBackend (file | env) → SecretCache
//!     → UpstreamClient, HeaderGeolocator
//!     → StreamRewriter (esi.rules)
//!     → Dispatcher: ServedBy → routes → ErrorResponder → AccessLog, RequestMetrics
//!     → EdgeServer
//! ```
//!
//! # Design Decisions
//! - Every collaborator is built here and handed to its consumer; nothing is
//!   reached through globals
//! - Any wiring error (bad rule, duplicate route, bad header value) aborts
//!   startup before the listener accepts traffic

use axum::http::Method;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::{EdgeConfig, SecretSource};
use crate::handlers::{ErrorResponder, EsiHandler, HelloWorld, ServedBy, SkywardsPage, WeatherHandler};
use crate::http::EdgeServer;
use crate::observability::{AccessLog, RequestMetrics};
use crate::rewrite::RewriteError;
use crate::routing::{Dispatcher, SetupError};
use crate::secrets::{EnvJsonBackend, JsonFileBackend, SecretBackend, SecretCache};
use crate::upstream::{FetchError, HeaderGeolocator, Location, UpstreamClient};

/// Why the service could not be assembled.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Routes(#[from] SetupError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Client(#[from] FetchError),

    #[error("invalid pop name {0:?}")]
    PopName(String),

    #[error("secrets source {0:?} is missing its location")]
    SecretSource(SecretSource),
}

/// The assembled edge service.
pub struct EdgeService {
    config: EdgeConfig,
    dispatcher: Arc<Dispatcher>,
    secrets: Arc<SecretCache>,
}

impl EdgeService {
    /// Build the service, reading secrets from the configured backend.
    pub fn build(config: EdgeConfig) -> Result<Self, ServiceError> {
        let backend = secret_backend(&config)?;
        Self::with_secret_backend(config, backend)
    }

    /// Build the service around an explicit secret backend.
    pub fn with_secret_backend(
        config: EdgeConfig,
        backend: Arc<dyn SecretBackend>,
    ) -> Result<Self, ServiceError> {
        let secrets = Arc::new(SecretCache::from_backend(backend));
        let client = UpstreamClient::new(&config.timeouts)?;
        let geolocator = Arc::new(HeaderGeolocator::new(Location::from(
            &config.weather.default_location,
        )));

        let served_by = ServedBy::new(&config.service.pop_name)
            .map_err(|_| ServiceError::PopName(config.service.pop_name.clone()))?;
        let esi = EsiHandler::from_config(&config.esi, client.clone())?;
        let weather = WeatherHandler::new(&config.weather, secrets.clone(), client, geolocator);

        let dispatcher = Dispatcher::builder()
            .use_middleware(served_by)
            .use_error_middleware(ErrorResponder)
            .route(Method::GET, "/", HelloWorld::logged())
            .get("/hello-world", HelloWorld::new())
            .get("/weather", weather)
            .get("/skywards", SkywardsPage::new(&config.skywards.title))
            .get("/esi", esi)
            .on_response(AccessLog::from_config(&config.observability))
            .on_response(RequestMetrics)
            .build()?;

        tracing::info!(
            pop_name = %config.service.pop_name,
            rewrite_rules = config.esi.rules.len(),
            "Edge service assembled"
        );

        Ok(Self {
            config,
            dispatcher: Arc::new(dispatcher),
            secrets,
        })
    }

    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn secrets(&self) -> Arc<SecretCache> {
        self.secrets.clone()
    }

    pub fn server(&self) -> EdgeServer {
        EdgeServer::new(&self.config, self.dispatcher())
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        self.server().run(listener, shutdown).await
    }
}

fn secret_backend(config: &EdgeConfig) -> Result<Arc<dyn SecretBackend>, ServiceError> {
    let secrets = &config.secrets;
    match secrets.source {
        SecretSource::File => secrets
            .path
            .as_ref()
            .map(|path| Arc::new(JsonFileBackend::new(path, &secrets.item)) as Arc<dyn SecretBackend>)
            .ok_or(ServiceError::SecretSource(SecretSource::File)),
        SecretSource::Env => secrets
            .env_var
            .as_ref()
            .map(|var| Arc::new(EnvJsonBackend::new(var, &secrets.item)) as Arc<dyn SecretBackend>)
            .ok_or(ServiceError::SecretSource(SecretSource::Env)),
    }
}
