//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     DispatcherBuilder::route / use_middleware / on_response
//!     → router.rs (exact method + path table, duplicates recorded)
//!     → build(): all registration errors at once, or a frozen Dispatcher
//!
//! Per request:
//!     EdgeRequest
//!     → dispatcher.rs (middleware → handler → error chain → hooks)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact matching only: no wildcards, no parameters
//! - Deterministic: same input always matches same route
//! - Duplicate (method, path) registrations abort startup

pub mod dispatcher;
pub mod handler;
pub mod router;

pub use dispatcher::{Dispatcher, DispatcherBuilder, SetupError};
pub use handler::{
    error_middleware_fn, handler_fn, middleware_fn, ErrorMiddleware, Handler, Middleware,
    ResponseHook,
};
pub use router::{RouteError, RouteTable};
