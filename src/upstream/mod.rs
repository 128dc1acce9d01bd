//! Outbound collaborators: HTTP fetch and client geolocation.

pub mod client;
pub mod geo;

use reqwest::StatusCode;
use thiserror::Error;

pub use client::{UpstreamBody, UpstreamClient};
pub use geo::{Geolocator, HeaderGeolocator, Location};

/// Outbound request failures.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },
}
