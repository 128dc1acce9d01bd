//! Response handling.
//!
//! # Responsibilities
//! - Canned responses emitted by the error chain
//! - Per-request [`ResponseContext`] accumulating status and headers until
//!   the response is sent
//!
//! # Design Decisions
//! - Once sent, a context rejects further mutation with
//!   [`EdgeError::ResponseAlreadySent`]
//! - Headers accumulated before `send` are merged into the sent response
//!   unless the response already carries that header name

use axum::body::Body;
use axum::http::header::{HeaderName, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::EdgeError;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// `404 Not Found` with a short text body.
pub fn not_found() -> Response {
    text(StatusCode::NOT_FOUND, "Not Found")
}

/// `500 Internal Server Error` with a short text body.
pub fn error() -> Response {
    error_with_status(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Error response for an arbitrary status, using its canonical reason.
pub fn error_with_status(status: StatusCode) -> Response {
    text(status, status.canonical_reason().unwrap_or("Error"))
}

/// Plain text response.
pub fn text(status: StatusCode, body: impl Into<String>) -> Response {
    (status, [(CONTENT_TYPE, TEXT_PLAIN)], body.into()).into_response()
}

/// Mutable per-request response state.
pub struct ResponseContext {
    status: StatusCode,
    headers: HeaderMap,
    sent: Option<Response>,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseContext {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            sent: None,
        }
    }

    /// Whether a response has been sent.
    pub fn is_sent(&self) -> bool {
        self.sent.is_some()
    }

    /// Status used by [`ResponseContext::send_body`].
    pub fn set_status(&mut self, status: StatusCode) -> Result<&mut Self, EdgeError> {
        self.ensure_open()?;
        self.status = status;
        Ok(self)
    }

    /// Append a header to be merged into the eventual response.
    pub fn append_header(
        &mut self,
        name: HeaderName,
        value: HeaderValue,
    ) -> Result<&mut Self, EdgeError> {
        self.ensure_open()?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Headers accumulated so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Finalize with a complete response.
    pub fn send(&mut self, mut response: Response) -> Result<(), EdgeError> {
        self.ensure_open()?;

        let accumulated = std::mem::take(&mut self.headers);
        let target = response.headers_mut();
        for name in accumulated.keys() {
            if target.contains_key(name) {
                continue;
            }
            for value in accumulated.get_all(name) {
                target.append(name.clone(), value.clone());
            }
        }

        self.sent = Some(response);
        Ok(())
    }

    /// Finalize with the accumulated status and the given body.
    pub fn send_body(&mut self, body: impl Into<Body>) -> Result<(), EdgeError> {
        let mut response = Response::new(body.into());
        *response.status_mut() = self.status;
        self.send(response)
    }

    /// The sent response, if any.
    pub fn response(&self) -> Option<&Response> {
        self.sent.as_ref()
    }

    pub fn into_response(self) -> Option<Response> {
        self.sent
    }

    fn ensure_open(&self) -> Result<(), EdgeError> {
        if self.is_sent() {
            Err(EdgeError::ResponseAlreadySent)
        } else {
            Ok(())
        }
    }
}
