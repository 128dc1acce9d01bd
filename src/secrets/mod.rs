//! Secret management subsystem.
//!
//! # Data Flow
//! ```text
//! handler → SecretCache::get(key)
//!     Loaded        → answer from memory
//!     Loading       → await the in-flight load
//!     Unloaded/Failed → start one load via SecretBackend::load_all
//! ```
//!
//! # Design Decisions
//! - The cache is constructed by the service and passed to handlers; there
//!   is no process-global instance
//! - One load serves every concurrent caller (shared future)
//! - Failures are not cached: the next caller retries
//! - A missing key in a loaded set is `Ok(None)`, never an error

pub mod backend;
pub mod cache;

use thiserror::Error;

pub use backend::{EnvJsonBackend, JsonFileBackend, SecretBackend};
pub use cache::{CacheStatus, SecretCache};

/// Why the secret set could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("secret store unreachable: {0}")]
    Unreachable(String),

    #[error("secret item {0:?} not found")]
    NotFound(String),

    #[error("malformed secret payload: {0}")]
    Malformed(String),
}
