//! Pull-based streaming stage around [`HtmlRewriter`].

use bytes::Bytes;
use futures_util::stream::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use crate::rewrite::rule::{Replacement, RewriteRule};
use crate::rewrite::scanner::HtmlRewriter;
use crate::rewrite::selector::Selector;
use crate::rewrite::RewriteError;

/// Rule set plus the ability to start rewriting passes.
///
/// Rules are registered up front; once the first pass has started the set
/// is frozen and further registration fails.
#[derive(Debug)]
pub struct StreamRewriter {
    rules: Arc<[RewriteRule]>,
    started: AtomicBool,
}

impl Default for StreamRewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamRewriter {
    pub fn new() -> Self {
        Self {
            rules: Vec::new().into(),
            started: AtomicBool::new(false),
        }
    }

    pub fn register(&mut self, rule: RewriteRule) -> Result<&mut Self, RewriteError> {
        if self.started.load(Ordering::Acquire) {
            return Err(RewriteError::AlreadyStreaming {
                selector: rule.selector.to_string(),
            });
        }
        let mut rules = self.rules.to_vec();
        rules.push(rule);
        self.rules = rules.into();
        Ok(self)
    }

    /// Parse `selector` and register a rule for it.
    pub fn on_element(
        &mut self,
        selector: &str,
        replacement: impl Into<Replacement>,
    ) -> Result<&mut Self, RewriteError> {
        let selector = Selector::parse(selector)?;
        self.register(RewriteRule::new(selector, replacement))
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Start a pass over `input`. Each call is an independent pass.
    pub fn transform<S>(&self, input: S) -> RewriteStream<S> {
        self.started.store(true, Ordering::Release);
        RewriteStream {
            input,
            rewriter: HtmlRewriter::new(self.rules.clone()),
            finished: false,
        }
    }
}

/// Output side of one rewriting pass.
///
/// Upstream is only polled when this stream is polled, and each upstream
/// chunk yields at most one output chunk. Dropping the stream drops the
/// upstream and any held-back bytes.
pub struct RewriteStream<S> {
    input: S,
    rewriter: HtmlRewriter,
    finished: bool,
}

impl<S> RewriteStream<S> {
    /// Bytes held back waiting for more input.
    pub fn buffered_len(&self) -> usize {
        self.rewriter.buffered()
    }
}

impl<S, B, E> Stream for RewriteStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            let mut out = Vec::new();
            match ready!(Pin::new(&mut this.input).poll_next(cx)) {
                Some(Ok(chunk)) => {
                    this.rewriter.write(chunk.as_ref(), &mut out);
                }
                Some(Err(err)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    this.finished = true;
                    this.rewriter.end(&mut out);
                    tracing::debug!(replaced = this.rewriter.replaced(), "Rewrite pass complete");
                }
            }

            if !out.is_empty() {
                return Poll::Ready(Some(Ok(Bytes::from(out))));
            }
        }
    }
}
