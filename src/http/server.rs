//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router whose single fallback feeds the [`Dispatcher`]
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bound concurrent dispatches with a semaphore (backpressure)
//! - Bind server to listener
//! - Serve until the shutdown signal fires, then drain

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::EdgeConfig;
use crate::http::request::{EdgeRequest, MakeEdgeRequestId, X_REQUEST_ID};
use crate::http::response;
use crate::routing::Dispatcher;

/// Application state injected into the fallback handler.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    /// Permits for concurrently running dispatches.
    dispatch_limit: Arc<Semaphore>,
}

/// HTTP front end for the dispatch pipeline.
pub struct EdgeServer {
    router: Router,
}

impl EdgeServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &EdgeConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            router: Self::build_router(config, dispatcher),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &EdgeConfig, dispatcher: Arc<Dispatcher>) -> Router {
        let x_request_id = axum::http::HeaderName::from_static(X_REQUEST_ID);
        let state = AppState {
            dispatcher,
            dispatch_limit: Arc::new(Semaphore::new(config.listener.max_concurrent_requests)),
        };

        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(x_request_id, MakeEdgeRequestId))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every request, whatever its method or path, goes through the dispatcher.
/// Requests beyond the concurrency limit wait for a permit.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let Ok(_permit) = state.dispatch_limit.acquire().await else {
        return response::error_with_status(StatusCode::SERVICE_UNAVAILABLE);
    };
    state.dispatcher.dispatch(EdgeRequest::from_http(request)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler_fn;
    use tower::ServiceExt;

    fn router() -> Router {
        let dispatcher = Dispatcher::builder()
            .get(
                "/ping",
                handler_fn(|_req| async { Ok(response::text(StatusCode::OK, "pong")) }),
            )
            .build()
            .unwrap();
        EdgeServer::build_router(&EdgeConfig::default(), Arc::new(dispatcher))
    }

    #[tokio::test]
    async fn test_fallback_feeds_dispatcher() {
        let response = router()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_REQUEST_ID));

        let response = router()
            .oneshot(Request::get("/nested/unknown").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_incoming_request_id_kept() {
        let response = router()
            .oneshot(
                Request::get("/ping")
                    .header(X_REQUEST_ID, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[X_REQUEST_ID], "abc-123");
    }
}
