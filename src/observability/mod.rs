//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields, request ID in HTTP spans)
//!     → metrics.rs (counters, histograms)
//!
//! Dispatcher response hooks:
//!     → logging.rs AccessLog (one JSON record per request)
//!     → metrics.rs RequestMetrics (request counter + latency)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all subsystems
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, AccessLog};
pub use metrics::{init_metrics, RequestMetrics};
