//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Snapshot the inbound request into an [`EdgeRequest`] for dispatch
//! - Extract routing-relevant information (method, path, client address)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Handlers see an owned, cheaply cloneable view of the request; the
//!   inbound body is not consumed since no route reads it

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Uri};
use std::net::SocketAddr;
use std::time::Instant;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates `x-request-id` values for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeEdgeRequestId;

impl MakeRequestId for MakeEdgeRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Inbound request as seen by middleware and route handlers.
#[derive(Debug, Clone)]
pub struct EdgeRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    client_addr: Option<SocketAddr>,
    received_at: Instant,
}

impl EdgeRequest {
    /// Build a request from its parts.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
            client_addr: None,
            received_at: Instant::now(),
        }
    }

    /// Convenience constructor for a bodiless GET.
    pub fn get(uri: &str) -> Self {
        let uri = uri.parse().unwrap_or_else(|_| Uri::from_static("/"));
        Self::new(Method::GET, uri, HeaderMap::new())
    }

    /// Capture an inbound axum request. The peer address is read from
    /// `ConnectInfo` when the server was started with connect info.
    pub fn from_http(request: Request<Body>) -> Self {
        let (parts, _body) = request.into_parts();
        let client_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            client_addr,
            received_at: Instant::now(),
        }
    }

    pub fn with_client_addr(mut self, addr: SocketAddr) -> Self {
        self.client_addr = Some(addr);
        self
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.client_addr
    }

    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    /// Request ID assigned by the request-id layer, or `"unknown"`.
    pub fn request_id(&self) -> &str {
        self.header(X_REQUEST_ID).unwrap_or("unknown")
    }

}
