//! Edge-side include assembly.
//!
//! Fetches the origin page and streams it back with every configured
//! placeholder element swapped for its include tag. The body is never
//! buffered whole.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::Response;
use std::sync::Arc;

use crate::config::EsiConfig;
use crate::error::EdgeError;
use crate::http::request::EdgeRequest;
use crate::http::response;
use crate::rewrite::{RewriteError, StreamRewriter};
use crate::routing::Handler;
use crate::upstream::UpstreamClient;

pub const X_AEM_ESI: &str = "x-aem-esi";

pub struct EsiHandler {
    client: UpstreamClient,
    origin_url: String,
    rewriter: Arc<StreamRewriter>,
}

impl EsiHandler {
    pub fn new(client: UpstreamClient, origin_url: impl Into<String>, rewriter: StreamRewriter) -> Self {
        Self {
            client,
            origin_url: origin_url.into(),
            rewriter: Arc::new(rewriter),
        }
    }

    /// Build the rewriter from the configured rules.
    pub fn from_config(config: &EsiConfig, client: UpstreamClient) -> Result<Self, RewriteError> {
        let mut rewriter = StreamRewriter::new();
        for rule in &config.rules {
            rewriter.on_element(&rule.selector, rule.replacement.as_str())?;
        }
        Ok(Self::new(client, config.origin_url.clone(), rewriter))
    }
}

#[async_trait]
impl Handler for EsiHandler {
    async fn call(&self, request: &EdgeRequest) -> Result<Response, EdgeError> {
        let request_id = request.request_id();
        tracing::info!(request_id, origin = %self.origin_url, "Rewriting ESI request");

        let body = match self.client.get_stream(&self.origin_url).await {
            Ok((_, body)) => body,
            Err(e) => {
                tracing::warn!(request_id, error = %e, "ESI origin fetch failed");
                return Ok(response::text(StatusCode::BAD_GATEWAY, "Upstream request failed"));
            }
        };

        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/html")
            .header(X_AEM_ESI, "on")
            .body(Body::from_stream(self.rewriter.transform(body)))
            .map_err(|e| EdgeError::handler(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RewriteRuleConfig, TimeoutConfig};

    fn client() -> UpstreamClient {
        UpstreamClient::new(&TimeoutConfig::default()).unwrap()
    }

    #[test]
    fn test_default_rules() {
        let handler = EsiHandler::from_config(&EsiConfig::default(), client()).unwrap();
        assert_eq!(handler.rewriter.rules().len(), 1);
        assert_eq!(handler.rewriter.rules()[0].selector.to_string(), "div.esi");
    }

    #[test]
    fn test_bad_rule_rejected() {
        let config = EsiConfig {
            rules: vec![RewriteRuleConfig {
                selector: "div:first-child".into(),
                replacement: String::new(),
            }],
            ..EsiConfig::default()
        };
        assert!(matches!(
            EsiHandler::from_config(&config, client()),
            Err(RewriteError::InvalidSelector { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_origin_is_bad_gateway() {
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let origin = format!("http://{}/", closed.local_addr().unwrap());
        drop(closed);

        let handler = EsiHandler::new(client(), origin, StreamRewriter::new());
        let response = handler.call(&EdgeRequest::get("/esi")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
