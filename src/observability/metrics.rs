//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define edge metrics (requests, latency, secret loads, rewrites)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `edge_requests_total` (counter): total requests by method, status
//! - `edge_request_duration_seconds` (histogram): latency distribution
//! - `edge_secret_loads_total` (counter): secret set loads by outcome
//! - `edge_rewrites_total` (counter): elements replaced by the rewriter
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so library code and
//!   tests never need to initialize metrics
//! - Labels stay low-cardinality: no paths, no request IDs

use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

use crate::http::request::EdgeRequest;
use crate::routing::ResponseHook;

/// Install the global recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    counter!("edge_requests_total", &labels).increment(1);
    histogram!("edge_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// Record the outcome of a secret set load (`success` or `failure`).
pub fn record_secret_load(outcome: &'static str) {
    counter!("edge_secret_loads_total", "outcome" => outcome).increment(1);
}

/// Record one element replaced by the HTML rewriter.
pub fn record_rewrite() {
    counter!("edge_rewrites_total").increment(1);
}

/// Response hook feeding the request counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestMetrics;

impl ResponseHook for RequestMetrics {
    fn on_response(&self, request: &EdgeRequest, response: &Response) {
        record_request(
            request.method().as_str(),
            response.status().as_u16(),
            request.received_at(),
        );
    }
}
