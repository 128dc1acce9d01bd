//! Streaming HTML rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! upstream body (Stream<Result<Bytes, E>>)
//!     → stream.rs  (RewriteStream: pulls a chunk when polled)
//!     → scanner.rs (HtmlRewriter: tokenizes, forwards, captures matches)
//!     → selector.rs (tag + class matching)
//!     → rule.rs    (replacement markup)
//!     → rewritten body (Stream<Result<Bytes, E>>)
//! ```
//!
//! # Design Decisions
//! - Not an HTML parser: no DOM, no tree fix-up, no entity decoding
//! - Rules are frozen once the first pass starts
//! - Replacement is wholesale and never re-scanned

pub mod rule;
pub mod scanner;
pub mod selector;
pub mod stream;

use thiserror::Error;

pub use rule::{Replacement, RewriteRule};
pub use scanner::HtmlRewriter;
pub use selector::{Element, Selector};
pub use stream::{RewriteStream, StreamRewriter};

/// Setup-time rewriting errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector {
        selector: String,
        reason: &'static str,
    },

    #[error("rule for {selector} registered after streaming started")]
    AlreadyStreaming { selector: String },
}
