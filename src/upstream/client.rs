//! Outbound HTTP client.

use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use std::time::Duration;

use crate::config::TimeoutConfig;
use crate::upstream::FetchError;

/// Body of an upstream response, as it arrives.
pub type UpstreamBody = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// Shared reqwest client with the configured timeouts.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.upstream_connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_request_secs))
            .user_agent(concat!("edge-dispatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// GET `url`, optionally with a bearer token. Any status is returned to
    /// the caller; only transport failures are errors.
    pub async fn get(&self, url: &str, bearer: Option<&str>) -> Result<reqwest::Response, FetchError> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        tracing::debug!(url, status = %response.status(), "Upstream responded");
        Ok(response)
    }

    /// GET `url` and hand back its body as a stream. Non-2xx statuses are
    /// errors.
    pub async fn get_stream(&self, url: &str) -> Result<(StatusCode, UpstreamBody), FetchError> {
        let response = self.get(url, None).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok((status, response.bytes_stream().boxed()))
    }
}
