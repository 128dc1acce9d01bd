//! Local temperature for the caller's location.
//!
//! # Data Flow
//! ```text
//! request
//!     → SecretCache::get("API_TOKEN")   (fallback: configured default token)
//!     → Geolocator::locate              (fallback: configured default location)
//!     → GET {base_url}/v1/forecast?current=temperature_2m&latitude=..&longitude=..
//!     → plain text sentence, cacheable for five minutes
//! ```

use async_trait::async_trait;
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use crate::config::WeatherConfig;
use crate::error::EdgeError;
use crate::http::request::EdgeRequest;
use crate::http::response;
use crate::routing::Handler;
use crate::secrets::SecretCache;
use crate::upstream::{Geolocator, Location, UpstreamClient};

pub const API_TOKEN: &str = "API_TOKEN";

const FETCH_FAILED: &str = "Error fetching weather data";
const NO_DATA: &str = "No weather data available";
const CACHE_FOR: &str = "max-age=300";

#[derive(Debug, Deserialize)]
struct Forecast {
    #[serde(default)]
    current: Option<Current>,
}

#[derive(Debug, Deserialize)]
struct Current {
    #[serde(default)]
    temperature_2m: Option<f64>,
}

pub struct WeatherHandler {
    secrets: Arc<SecretCache>,
    client: UpstreamClient,
    geolocator: Arc<dyn Geolocator>,
    base_url: String,
    default_token: String,
}

impl WeatherHandler {
    pub fn new(
        config: &WeatherConfig,
        secrets: Arc<SecretCache>,
        client: UpstreamClient,
        geolocator: Arc<dyn Geolocator>,
    ) -> Self {
        Self {
            secrets,
            client,
            geolocator,
            base_url: config.base_url.clone(),
            default_token: config.default_api_token.clone(),
        }
    }

    async fn api_token(&self, request_id: &str) -> String {
        match self.secrets.get(API_TOKEN).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::warn!(request_id, "No API_TOKEN secret found, using default api token");
                self.default_token.clone()
            }
            Err(e) => {
                tracing::warn!(
                    request_id,
                    error = %e,
                    "Secrets unavailable, using default api token"
                );
                self.default_token.clone()
            }
        }
    }
}

#[async_trait]
impl Handler for WeatherHandler {
    async fn call(&self, request: &EdgeRequest) -> Result<Response, EdgeError> {
        let request_id = request.request_id();
        let token = self.api_token(request_id).await;
        let location = self.geolocator.locate(request);
        tracing::debug!(
            request_id,
            city = %location.city,
            latitude = location.latitude,
            longitude = location.longitude,
            "Resolved client location"
        );

        let url = forecast_url(&self.base_url, &location)?;
        let upstream = match self.client.get(url.as_str(), Some(&token)).await {
            Ok(upstream) if upstream.status() == StatusCode::OK => upstream,
            Ok(upstream) => {
                tracing::warn!(request_id, status = %upstream.status(), "Weather API rejected request");
                return Ok(response::text(StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED));
            }
            Err(e) => {
                tracing::warn!(request_id, error = %e, "Weather API unreachable");
                return Ok(response::text(StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED));
            }
        };

        let body = upstream
            .bytes()
            .await
            .map_err(|e| EdgeError::handler(format!("failed to read weather response: {e}")))?;
        let forecast: Forecast = serde_json::from_slice(&body)
            .map_err(|e| EdgeError::handler(format!("malformed weather response: {e}")))?;

        let mut response = response::text(StatusCode::OK, describe(&location, &forecast));
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_FOR));
        Ok(response)
    }
}

fn forecast_url(base_url: &str, location: &Location) -> Result<Url, EdgeError> {
    let latitude = location.latitude.to_string();
    let longitude = location.longitude.to_string();
    Url::parse_with_params(
        &format!("{}/v1/forecast", base_url.trim_end_matches('/')),
        [
            ("current", "temperature_2m"),
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
        ],
    )
    .map_err(|e| EdgeError::handler(format!("invalid weather url: {e}")))
}

fn describe(location: &Location, forecast: &Forecast) -> String {
    match forecast.current.as_ref().and_then(|c| c.temperature_2m) {
        Some(temperature) => format!(
            "It seems you are based in {} where the local temperature is {}°C",
            location.city, temperature
        ),
        None => NO_DATA.to_string(),
    }
}
