//! Request-level error taxonomy.
//!
//! Every failure that can reach the dispatcher is one variant of
//! [`EdgeError`]. Each variant carries the status code the error chain
//! answers with, so classification is an exhaustive `match` rather than a
//! lookup on loosely shaped error objects.

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::rewrite::RewriteError;
use crate::secrets::SecretError;
use crate::upstream::FetchError;

/// Errors produced while handling a single request.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// No route is registered for the request's method and path.
    #[error("no route for {method} {path}")]
    NoRouteMatch { method: Method, path: String },

    /// A route handler or middleware failed.
    #[error("handler failed: {message}")]
    HandlerFailure { status: StatusCode, message: String },

    /// The secret cache could not be populated.
    #[error("secret unavailable: {0}")]
    SecretUnavailable(#[from] SecretError),

    /// A rewrite rule was rejected.
    #[error("stream configuration error: {0}")]
    StreamConfiguration(#[from] RewriteError),

    /// An outbound request failed or returned a non-success status.
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(#[from] FetchError),

    /// The response context was mutated after the response was sent.
    #[error("response already sent")]
    ResponseAlreadySent,
}

impl EdgeError {
    /// Shorthand for a handler failure answered with `500`.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::HandlerFailure {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Handler failure carrying an explicit status.
    pub fn handler_with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerFailure {
            status,
            message: message.into(),
        }
    }

    /// Status code the error chain should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            EdgeError::NoRouteMatch { .. } => StatusCode::NOT_FOUND,
            EdgeError::HandlerFailure { status, .. } => *status,
            EdgeError::SecretUnavailable(_)
            | EdgeError::StreamConfiguration(_)
            | EdgeError::UpstreamFetch(_)
            | EdgeError::ResponseAlreadySent => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
