//! Route table.
//!
//! # Responsibilities
//! - Store registered routes keyed by method, then exact path
//! - Look up the handler for a request
//! - Reject duplicate and malformed registrations
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - O(1) lookup via nested HashMap, no allocation on the hot path
//! - Explicit `None` on miss rather than a silent default

use axum::http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::routing::handler::Handler;

/// Reasons a route registration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("duplicate route {method} {path}")]
    Duplicate { method: Method, path: String },

    #[error("route path must start with '/': {0:?}")]
    InvalidPath(String),
}

/// Exact-match `(method, path)` → handler map.
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<Method, HashMap<String, Arc<dyn Handler>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. The first registration of a `(method, path)` pair
    /// is kept; later ones are rejected.
    pub fn insert(
        &mut self,
        method: Method,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RouteError> {
        if !path.starts_with('/') {
            return Err(RouteError::InvalidPath(path.to_string()));
        }

        let by_path = self.routes.entry(method.clone()).or_default();
        if by_path.contains_key(path) {
            return Err(RouteError::Duplicate {
                method,
                path: path.to_string(),
            });
        }

        by_path.insert(path.to_string(), handler);
        Ok(())
    }

    /// Find the handler registered for exactly this method and path.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<&Arc<dyn Handler>> {
        self.routes.get(method).and_then(|by_path| by_path.get(path))
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
