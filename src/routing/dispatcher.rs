//! Request dispatch pipeline.
//!
//! ```text
//! EdgeRequest
//!     → pre-handler middleware (in registration order, may send)
//!     → route lookup (exact method + path)
//!     → handler → ResponseContext::send
//!     ↘ on NoRouteMatch / failure: error chain (first sender wins)
//!                                  → default response if nobody sent
//!     → response hooks (exactly once)
//!     → Response
//! ```

use axum::http::{Method, StatusCode};
use axum::response::Response;
use std::sync::Arc;
use thiserror::Error;

use crate::error::EdgeError;
use crate::http::request::EdgeRequest;
use crate::http::response::{self, ResponseContext};
use crate::routing::handler::{ErrorMiddleware, Handler, Middleware, ResponseHook};
use crate::routing::router::{RouteError, RouteTable};

/// Invalid dispatcher configuration. Lists every rejected registration.
#[derive(Debug, Error)]
#[error("invalid routes: {}", join(.0))]
pub struct SetupError(pub Vec<RouteError>);

fn join(errors: &[RouteError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collects routes, middleware and hooks at startup.
#[derive(Default)]
pub struct DispatcherBuilder {
    routes: RouteTable,
    middleware: Vec<Arc<dyn Middleware>>,
    error_chain: Vec<Arc<dyn ErrorMiddleware>>,
    hooks: Vec<Arc<dyn ResponseHook>>,
    errors: Vec<RouteError>,
}

impl DispatcherBuilder {
    /// Append a pre-handler middleware.
    pub fn use_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Append an error-handling middleware.
    pub fn use_error_middleware(mut self, middleware: impl ErrorMiddleware + 'static) -> Self {
        self.error_chain.push(Arc::new(middleware));
        self
    }

    /// Register a GET route.
    pub fn get(self, path: &str, handler: impl Handler + 'static) -> Self {
        self.route(Method::GET, path, handler)
    }

    /// Register a route. Rejections are reported by [`DispatcherBuilder::build`].
    pub fn route(mut self, method: Method, path: &str, handler: impl Handler + 'static) -> Self {
        if let Err(err) = self.routes.insert(method, path, Arc::new(handler)) {
            self.errors.push(err);
        }
        self
    }

    /// Register a post-response hook.
    pub fn on_response(mut self, hook: impl ResponseHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Freeze the configuration.
    pub fn build(self) -> Result<Dispatcher, SetupError> {
        if !self.errors.is_empty() {
            return Err(SetupError(self.errors));
        }

        tracing::debug!(
            routes = self.routes.len(),
            middleware = self.middleware.len(),
            error_middleware = self.error_chain.len(),
            hooks = self.hooks.len(),
            "Dispatcher built"
        );

        Ok(Dispatcher {
            routes: self.routes,
            middleware: self.middleware,
            error_chain: self.error_chain,
            hooks: self.hooks,
        })
    }
}

/// Immutable dispatch pipeline, shared across requests.
pub struct Dispatcher {
    routes: RouteTable,
    middleware: Vec<Arc<dyn Middleware>>,
    error_chain: Vec<Arc<dyn ErrorMiddleware>>,
    hooks: Vec<Arc<dyn ResponseHook>>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Run one request through the pipeline. Always yields a response.
    pub async fn dispatch(&self, request: EdgeRequest) -> Response {
        tracing::debug!(
            request_id = %request.request_id(),
            method = %request.method(),
            path = %request.path(),
            "Dispatching request"
        );

        let mut ctx = ResponseContext::new();
        if let Err(error) = self.run(&request, &mut ctx).await {
            self.recover(error, &request, &mut ctx).await;
        }

        let response = match ctx.into_response() {
            Some(response) => response,
            None => {
                tracing::error!(
                    request_id = %request.request_id(),
                    "Pipeline finished without sending a response"
                );
                response::error()
            }
        };

        for hook in &self.hooks {
            hook.on_response(&request, &response);
        }

        response
    }

    async fn run(&self, request: &EdgeRequest, ctx: &mut ResponseContext) -> Result<(), EdgeError> {
        for middleware in &self.middleware {
            middleware.handle(request, ctx).await?;
            if ctx.is_sent() {
                tracing::debug!(
                    request_id = %request.request_id(),
                    "Middleware sent response, skipping route"
                );
                return Ok(());
            }
        }

        let handler = self
            .routes
            .lookup(request.method(), request.path())
            .ok_or_else(|| EdgeError::NoRouteMatch {
                method: request.method().clone(),
                path: request.path().to_string(),
            })?;

        let response = handler.call(request).await?;
        ctx.send(response)
    }

    async fn recover(&self, error: EdgeError, request: &EdgeRequest, ctx: &mut ResponseContext) {
        if ctx.is_sent() {
            tracing::warn!(
                request_id = %request.request_id(),
                error = %error,
                "Error raised after response was sent"
            );
            return;
        }

        for middleware in &self.error_chain {
            if let Err(chain_error) = middleware.handle(&error, request, ctx).await {
                tracing::warn!(
                    request_id = %request.request_id(),
                    error = %chain_error,
                    "Error middleware failed"
                );
            }
            if ctx.is_sent() {
                return;
            }
        }

        let status = error.status();
        tracing::warn!(
            request_id = %request.request_id(),
            status = status.as_u16(),
            error = %error,
            "Error chain sent nothing, using default response"
        );

        let fallback = if status == StatusCode::NOT_FOUND {
            response::not_found()
        } else {
            response::error_with_status(status)
        };
        if let Err(send_error) = ctx.send(fallback) {
            tracing::error!(error = %send_error, "Failed to send default error response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler::{error_middleware_fn, handler_fn, middleware_fn};
    use axum::http::{HeaderName, HeaderValue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn text_handler(body: &'static str) -> impl Handler {
        handler_fn(move |_req| async move { Ok(response::text(StatusCode::OK, body)) })
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_exactly_one_handler_runs() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut builder = Dispatcher::builder();
        for path in ["/", "/hello-world", "/weather", "/skywards", "/esi"] {
            let calls = calls.clone();
            builder = builder.get(
                path,
                handler_fn(move |req: EdgeRequest| {
                    let calls = calls.clone();
                    async move {
                        calls.lock().unwrap().push(req.path().to_string());
                        Ok(response::text(StatusCode::OK, "ok"))
                    }
                }),
            );
        }
        let dispatcher = builder.build().unwrap();

        for path in ["/", "/hello-world", "/weather", "/skywards", "/esi"] {
            calls.lock().unwrap().clear();
            let response = dispatcher.dispatch(EdgeRequest::get(path)).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(*calls.lock().unwrap(), vec![path.to_string()]);
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_404_and_hook_runs_once() {
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let hc = hook_calls.clone();
        let dispatcher = Dispatcher::builder()
            .get("/hello-world", text_handler("hi"))
            .on_response(move |_req: &EdgeRequest, response: &Response| {
                assert_eq!(response.status(), StatusCode::NOT_FOUND);
                hc.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        let response = dispatcher.dispatch(EdgeRequest::get("/does-not-exist")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_method_must_match() {
        let dispatcher = Dispatcher::builder()
            .get("/hello-world", text_handler("hi"))
            .build()
            .unwrap();

        let request = EdgeRequest::new(
            Method::POST,
            "/hello-world".parse().unwrap(),
            Default::default(),
        );
        let response = dispatcher.dispatch(request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_middleware_runs_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (o1, o2, o3) = (order.clone(), order.clone(), order.clone());

        let dispatcher = Dispatcher::builder()
            .use_middleware(middleware_fn(move |_req, _res| {
                o1.lock().unwrap().push("first");
                Ok(())
            }))
            .use_middleware(middleware_fn(move |_req, _res| {
                o2.lock().unwrap().push("second");
                Ok(())
            }))
            .get(
                "/",
                handler_fn(move |_req| {
                    let o3 = o3.clone();
                    async move {
                        o3.lock().unwrap().push("handler");
                        Ok(response::text(StatusCode::OK, "root"))
                    }
                }),
            )
            .build()
            .unwrap();

        dispatcher.dispatch(EdgeRequest::get("/")).await;
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "handler"]);
    }

    #[tokio::test]
    async fn test_middleware_short_circuit_skips_handler() {
        let handler_calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let later_calls = Arc::new(AtomicUsize::new(0));
        let (hc, hk, lc) = (handler_calls.clone(), hook_calls.clone(), later_calls.clone());

        let dispatcher = Dispatcher::builder()
            .use_middleware(middleware_fn(|_req, res| {
                res.set_status(StatusCode::FORBIDDEN)?;
                res.send_body("blocked")
            }))
            .use_middleware(middleware_fn(move |_req, _res| {
                lc.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .get(
                "/",
                handler_fn(move |_req| {
                    hc.fetch_add(1, Ordering::SeqCst);
                    async { Ok(response::text(StatusCode::OK, "root")) }
                }),
            )
            .on_response(move |_req: &EdgeRequest, _res: &Response| {
                hk.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        let response = dispatcher.dispatch(EdgeRequest::get("/")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_string(response).await, "blocked");
        assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_middleware_headers_reach_response() {
        let dispatcher = Dispatcher::builder()
            .use_middleware(middleware_fn(|_req, res| {
                res.append_header(
                    HeaderName::from_static("x-served-by"),
                    HeaderValue::from_static("pop-test"),
                )?;
                Ok(())
            }))
            .get("/hello-world", text_handler("hi"))
            .build()
            .unwrap();

        let response = dispatcher.dispatch(EdgeRequest::get("/hello-world")).await;
        assert_eq!(response.headers()["x-served-by"], "pop-test");
    }

    #[tokio::test]
    async fn test_error_chain_order_and_first_sender_wins() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (o1, o2, o3) = (order.clone(), order.clone(), order.clone());

        let dispatcher = Dispatcher::builder()
            .use_error_middleware(error_middleware_fn(move |_err, _req, _res| {
                o1.lock().unwrap().push("observer");
                Ok(())
            }))
            .use_error_middleware(error_middleware_fn(move |err, _req, res| {
                o2.lock().unwrap().push("responder");
                res.set_status(err.status())?;
                res.send_body("handled")
            }))
            .use_error_middleware(error_middleware_fn(move |_err, _req, res| {
                o3.lock().unwrap().push("unreachable");
                res.send_body("too late")
            }))
            .get(
                "/fail",
                handler_fn(|_req| async { Err(EdgeError::handler("kaput")) }),
            )
            .build()
            .unwrap();

        let response = dispatcher.dispatch(EdgeRequest::get("/fail")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "handled");
        assert_eq!(*order.lock().unwrap(), vec!["observer", "responder"]);
    }

    #[tokio::test]
    async fn test_handler_failure_status_is_kept() {
        let dispatcher = Dispatcher::builder()
            .get(
                "/teapot",
                handler_fn(|_req| async {
                    Err(EdgeError::handler_with_status(StatusCode::IM_A_TEAPOT, "short and stout"))
                }),
            )
            .build()
            .unwrap();

        let response = dispatcher.dispatch(EdgeRequest::get("/teapot")).await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_default_response_when_error_chain_sends_nothing() {
        let dispatcher = Dispatcher::builder()
            .use_error_middleware(error_middleware_fn(|_err, _req, _res| {
                Err(EdgeError::handler("error middleware broke"))
            }))
            .get("/fail", handler_fn(|_req| async { Err(EdgeError::handler("boom")) }))
            .build()
            .unwrap();

        let response = dispatcher.dispatch(EdgeRequest::get("/fail")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = dispatcher.dispatch(EdgeRequest::get("/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failing_middleware_goes_to_error_chain() {
        let dispatcher = Dispatcher::builder()
            .use_middleware(middleware_fn(|_req, _res| {
                Err(EdgeError::handler_with_status(StatusCode::BAD_REQUEST, "bad input"))
            }))
            .get("/", text_handler("root"))
            .build()
            .unwrap();

        let response = dispatcher.dispatch(EdgeRequest::get("/")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_duplicate_routes_rejected_at_build() {
        let result = Dispatcher::builder()
            .get("/esi", text_handler("a"))
            .get("/esi", text_handler("b"))
            .get("no-slash", text_handler("c"))
            .build();

        let err = match result {
            Ok(_) => panic!("duplicate routes must be rejected"),
            Err(err) => err,
        };
        assert_eq!(err.0.len(), 2);
        assert!(err.to_string().contains("duplicate route GET /esi"));
    }
}
