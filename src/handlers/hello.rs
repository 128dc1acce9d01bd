use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;

use crate::error::EdgeError;
use crate::http::request::EdgeRequest;
use crate::http::response;
use crate::routing::Handler;

pub const GREETING: &str = "Hello World from the edge!";

/// Static greeting.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelloWorld {
    log_hit: bool,
}

impl HelloWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variant that logs every hit, used for the root path.
    pub fn logged() -> Self {
        Self { log_hit: true }
    }
}

#[async_trait]
impl Handler for HelloWorld {
    async fn call(&self, request: &EdgeRequest) -> Result<Response, EdgeError> {
        if self.log_hit {
            tracing::info!(request_id = %request.request_id(), "{GREETING}");
        }
        Ok(response::text(StatusCode::OK, GREETING))
    }
}
