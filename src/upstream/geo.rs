//! Client geolocation.
//!
//! The edge platform in front of this service annotates requests with the
//! client's coordinates and city. Requests without usable coordinates fall
//! back to a configured location.

use crate::config::LocationConfig;
use crate::http::request::EdgeRequest;

pub const X_GEO_LATITUDE: &str = "x-geo-latitude";
pub const X_GEO_LONGITUDE: &str = "x-geo-longitude";
pub const X_GEO_CITY: &str = "x-geo-city";

const UNKNOWN_CITY: &str = "an unknown city";

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
}

impl From<&LocationConfig> for Location {
    fn from(config: &LocationConfig) -> Self {
        Self {
            latitude: config.latitude,
            longitude: config.longitude,
            city: config.city.clone(),
        }
    }
}

/// Resolves where a request came from.
pub trait Geolocator: Send + Sync {
    fn locate(&self, request: &EdgeRequest) -> Location;
}

/// Reads the `x-geo-*` headers.
#[derive(Debug, Clone)]
pub struct HeaderGeolocator {
    fallback: Location,
}

impl HeaderGeolocator {
    pub fn new(fallback: Location) -> Self {
        Self { fallback }
    }
}

impl Geolocator for HeaderGeolocator {
    fn locate(&self, request: &EdgeRequest) -> Location {
        let latitude = coordinate(request, X_GEO_LATITUDE, 90.0);
        let longitude = coordinate(request, X_GEO_LONGITUDE, 180.0);

        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Location {
                latitude,
                longitude,
                city: request
                    .header(X_GEO_CITY)
                    .map(str::trim)
                    .filter(|city| !city.is_empty())
                    .unwrap_or(UNKNOWN_CITY)
                    .to_string(),
            },
            _ => {
                tracing::debug!(
                    city = %self.fallback.city,
                    "No usable geo headers, using default location"
                );
                self.fallback.clone()
            }
        }
    }
}

fn coordinate(request: &EdgeRequest, header: &str, bound: f64) -> Option<f64> {
    request
        .header(header)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && value.abs() <= bound)
}
