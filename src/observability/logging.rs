//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Emit one access record per request (post-response hook)
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment (`RUST_LOG` wins)
//! - Access records are JSON lines regardless of the subscriber format

use axum::http::HeaderMap;
use axum::response::Response;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::http::request::EdgeRequest;
use crate::routing::ResponseHook;

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let level = config.log_level.to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("edge_dispatch={level},tower_http={level}")));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessRecord<'a> {
    method: &'a str,
    url: String,
    status: u16,
    request_id: &'a str,
    duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_headers: Option<BTreeMap<String, String>>,
}

/// Post-response hook writing the access log.
#[derive(Debug, Clone, Default)]
pub struct AccessLog {
    include_headers: bool,
}

impl AccessLog {
    pub fn new(include_headers: bool) -> Self {
        Self { include_headers }
    }

    pub fn from_config(config: &ObservabilityConfig) -> Self {
        Self::new(config.access_log_headers)
    }

    /// Serialize the record for one request/response pair.
    pub fn format(&self, request: &EdgeRequest, response: &Response) -> serde_json::Result<String> {
        let record = AccessRecord {
            method: request.method().as_str(),
            url: request.uri().to_string(),
            status: response.status().as_u16(),
            request_id: request.request_id(),
            duration_ms: request.received_at().elapsed().as_secs_f64() * 1000.0,
            client_addr: request.client_addr().map(|addr| addr.to_string()),
            request_headers: self.include_headers.then(|| header_map(request.headers())),
            response_headers: self.include_headers.then(|| header_map(response.headers())),
        };
        serde_json::to_string(&record)
    }
}

impl ResponseHook for AccessLog {
    fn on_response(&self, request: &EdgeRequest, response: &Response) {
        match self.format(request, response) {
            Ok(line) => tracing::info!(target: "edge_dispatch::access", "{line}"),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize access record"),
        }
    }
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = value.to_str().unwrap_or("<binary>");
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    map
}
