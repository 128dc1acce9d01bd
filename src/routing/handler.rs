//! Handler, middleware and hook traits.
//!
//! Route handlers produce a complete [`Response`]. Pre-handler middleware
//! either returns without sending (continue) or sends through the
//! [`ResponseContext`] (short-circuit). Error middleware receives the
//! classified [`EdgeError`] and may send a response; the first one that
//! sends ends the chain.

use async_trait::async_trait;
use axum::response::Response;
use std::future::Future;

use crate::error::EdgeError;
use crate::http::request::EdgeRequest;
use crate::http::response::ResponseContext;

/// Terminal handler for a route.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: &EdgeRequest) -> Result<Response, EdgeError>;
}

/// Runs before route lookup on every request.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        request: &EdgeRequest,
        response: &mut ResponseContext,
    ) -> Result<(), EdgeError>;
}

/// Runs only when dispatch failed.
#[async_trait]
pub trait ErrorMiddleware: Send + Sync {
    async fn handle(
        &self,
        error: &EdgeError,
        request: &EdgeRequest,
        response: &mut ResponseContext,
    ) -> Result<(), EdgeError>;
}

/// Observes the finalized request/response pair once per request.
pub trait ResponseHook: Send + Sync {
    fn on_response(&self, request: &EdgeRequest, response: &Response);
}

impl<F> ResponseHook for F
where
    F: Fn(&EdgeRequest, &Response) + Send + Sync,
{
    fn on_response(&self, request: &EdgeRequest, response: &Response) {
        self(request, response)
    }
}

/// Adapter turning an async closure into a [`Handler`].
///
/// The closure receives its own copy of the request.
pub struct HandlerFn<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(EdgeRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, EdgeError>> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(EdgeRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, EdgeError>> + Send + 'static,
{
    async fn call(&self, request: &EdgeRequest) -> Result<Response, EdgeError> {
        (self.0)(request.clone()).await
    }
}

/// Adapter for synchronous pre-handler middleware.
pub struct MiddlewareFn<F>(F);

pub fn middleware_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: Fn(&EdgeRequest, &mut ResponseContext) -> Result<(), EdgeError> + Send + Sync,
{
    MiddlewareFn(f)
}

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(&EdgeRequest, &mut ResponseContext) -> Result<(), EdgeError> + Send + Sync,
{
    async fn handle(
        &self,
        request: &EdgeRequest,
        response: &mut ResponseContext,
    ) -> Result<(), EdgeError> {
        (self.0)(request, response)
    }
}

/// Adapter for synchronous error middleware.
pub struct ErrorMiddlewareFn<F>(F);

pub fn error_middleware_fn<F>(f: F) -> ErrorMiddlewareFn<F>
where
    F: Fn(&EdgeError, &EdgeRequest, &mut ResponseContext) -> Result<(), EdgeError> + Send + Sync,
{
    ErrorMiddlewareFn(f)
}

#[async_trait]
impl<F> ErrorMiddleware for ErrorMiddlewareFn<F>
where
    F: Fn(&EdgeError, &EdgeRequest, &mut ResponseContext) -> Result<(), EdgeError> + Send + Sync,
{
    async fn handle(
        &self,
        error: &EdgeError,
        request: &EdgeRequest,
        response: &mut ResponseContext,
    ) -> Result<(), EdgeError> {
        (self.0)(error, request, response)
    }
}
