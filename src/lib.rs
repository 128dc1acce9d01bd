//! Edge Dispatch Library
//!
//! Request dispatch, streaming HTML rewriting and a single-flight secret
//! cache, assembled into an edge HTTP service by [`EdgeService`].

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod rewrite;
pub mod routing;
pub mod secrets;

// Collaborators
pub mod handlers;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub mod service;

pub use config::EdgeConfig;
pub use error::EdgeError;
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
pub use routing::{Dispatcher, DispatcherBuilder};
pub use service::EdgeService;
