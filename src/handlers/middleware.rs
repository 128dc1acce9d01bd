//! Pipeline-wide middleware.

use async_trait::async_trait;
use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderName, HeaderValue, StatusCode};

use crate::error::EdgeError;
use crate::http::request::EdgeRequest;
use crate::http::response::{self, ResponseContext};
use crate::routing::{ErrorMiddleware, Middleware};

pub const X_SERVED_BY: HeaderName = HeaderName::from_static("x-served-by");

/// Stamps every response with the name of the serving point of presence.
#[derive(Debug, Clone)]
pub struct ServedBy {
    pop_name: HeaderValue,
}

impl ServedBy {
    pub fn new(pop_name: &str) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            pop_name: HeaderValue::from_str(pop_name)?,
        })
    }
}

#[async_trait]
impl Middleware for ServedBy {
    async fn handle(
        &self,
        _request: &EdgeRequest,
        response: &mut ResponseContext,
    ) -> Result<(), EdgeError> {
        response.append_header(X_SERVED_BY, self.pop_name.clone())?;
        Ok(())
    }
}

/// Answers failed requests with the canned responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorResponder;

#[async_trait]
impl ErrorMiddleware for ErrorResponder {
    async fn handle(
        &self,
        error: &EdgeError,
        request: &EdgeRequest,
        response: &mut ResponseContext,
    ) -> Result<(), EdgeError> {
        let status = error.status();
        if status == StatusCode::NOT_FOUND {
            return response.send(response::not_found());
        }

        tracing::error!(
            request_id = %request.request_id(),
            method = %request.method(),
            path = %request.path(),
            status = status.as_u16(),
            error = %error,
            "Request failed"
        );
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            response.send(response::error())
        } else {
            response.send(response::error_with_status(status))
        }
    }
}
