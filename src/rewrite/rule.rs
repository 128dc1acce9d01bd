//! Rewrite rules: what to match and what to put in its place.

use std::fmt;
use std::sync::Arc;

use crate::rewrite::selector::{Element, Selector};

type ReplaceFn = dyn Fn(&Element) -> String + Send + Sync;

/// Markup substituted for a matched element.
#[derive(Clone)]
pub enum Replacement {
    /// Fixed markup.
    Markup(String),
    /// Markup computed from the matched element.
    Function(Arc<ReplaceFn>),
}

impl Replacement {
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&Element) -> String + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    pub fn render(&self, element: &Element) -> String {
        match self {
            Replacement::Markup(markup) => markup.clone(),
            Replacement::Function(f) => f(element),
        }
    }
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Markup(markup) => f.debug_tuple("Markup").field(markup).finish(),
            Replacement::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<&str> for Replacement {
    fn from(markup: &str) -> Self {
        Self::Markup(markup.to_string())
    }
}

impl From<String> for Replacement {
    fn from(markup: String) -> Self {
        Self::Markup(markup)
    }
}

/// A selector and its replacement.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub selector: Selector,
    pub replacement: Replacement,
}

impl RewriteRule {
    pub fn new(selector: Selector, replacement: impl Into<Replacement>) -> Self {
        Self {
            selector,
            replacement: replacement.into(),
        }
    }
}
