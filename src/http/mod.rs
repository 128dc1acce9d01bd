//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower layers, graceful shutdown)
//!     → request.rs (request ID, snapshot into EdgeRequest)
//!     → [routing::Dispatcher]
//!     → response.rs (ResponseContext, canned responses)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{EdgeRequest, MakeEdgeRequestId, X_REQUEST_ID};
pub use response::ResponseContext;
pub use server::EdgeServer;
