//! Matchers group handlers behind a common match rule.
//!
//! A [`Matcher`] carries a set of AND-composed checks, a priority, a
//! blocking flag and the handlers to run when the checks pass. The
//! [`Dispatcher`](crate::dispatcher::Dispatcher) considers matchers in
//! ascending priority order (ties keep registration order) and stops after
//! the first accepting matcher with `block = true`.
//!
//! ```rust,ignore
//! use veranda_core::{Matcher, on_keyword};
//!
//! let matcher = on_keyword(["hello"])
//!     .priority(1)
//!     .block(true)
//!     .handler(greet_handler);
//! ```

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use tower::Service;
use tracing::{debug, trace};

use crate::context::Context;
use crate::event::FromEvent;
use crate::handler::{BoxedHandler, Handler, into_handler};

/// A type-erased check function.
///
/// Checks are pure predicates over the context: no I/O, no mutation. Any
/// state a handler needs is looked up inside the handler, not the check.
pub type CheckFn = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Internal matcher data, wrapped in `Arc` for cheap cloning.
#[derive(Clone)]
struct MatcherInner {
    /// AND-composed checks; empty means match everything.
    checks: Vec<CheckFn>,
    /// Handlers to run when the checks pass, in registration order.
    handlers: Vec<BoxedHandler>,
    /// Lower runs earlier.
    priority: i32,
    /// Whether an accepting match stops lower-priority matchers.
    block: bool,
    /// Optional name for logs.
    name: Option<String>,
}

/// A group of handlers guarded by a common match rule.
#[derive(Clone)]
pub struct Matcher {
    inner: Arc<MatcherInner>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher {
    /// Creates an empty matcher that accepts every event.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MatcherInner {
                checks: Vec::new(),
                handlers: Vec::new(),
                priority: 1,
                block: false,
                name: None,
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut MatcherInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Sets a name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner_mut().name = Some(name.into());
        self
    }

    /// Adds a check. All checks must accept for the matcher to match.
    pub fn check<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.inner_mut().checks.push(Arc::new(f));
        self
    }

    /// Restricts the matcher to events extractable as `T`.
    pub fn on<T>(self) -> Self
    where
        T: FromEvent + 'static,
    {
        self.check(|ctx| T::from_event(ctx.event()).is_some())
    }

    /// Sets the priority. Lower values are considered earlier; the default
    /// is 1.
    pub fn priority(mut self, priority: i32) -> Self {
        self.inner_mut().priority = priority;
        self
    }

    /// Sets whether an accepting match stops lower-priority matchers.
    pub fn block(mut self, block: bool) -> Self {
        self.inner_mut().block = block;
        self
    }

    /// Restricts the matcher to events sent by the given user.
    pub fn from_user(self, user_id: u64) -> Self {
        self.check(move |ctx| match &ctx.event().kind {
            crate::event::EventKind::SendMessage(e) => e.from_user_id == user_id,
            crate::event::EventKind::AddQuickEmoticon(e) => e.uid == user_id,
            crate::event::EventKind::JoinVilla(e) => e.join_uid == user_id,
            _ => false,
        })
    }

    /// Restricts the matcher to events from the given room.
    pub fn in_room(self, room_id: u64) -> Self {
        self.check(move |ctx| ctx.event().room_id() == Some(room_id))
    }

    /// Restricts the matcher to events from the given villa.
    pub fn in_villa(self, villa_id: u64) -> Self {
        self.check(move |ctx| ctx.event().villa_id() == villa_id)
    }

    /// Adds a handler. Handlers keep their registration order.
    pub fn handler<F, T>(mut self, f: F) -> Self
    where
        F: Handler<T> + Send + Sync + 'static,
        T: 'static,
    {
        self.inner_mut().handlers.push(into_handler(f));
        self
    }

    /// Adds a pre-built boxed handler.
    pub fn handler_boxed(mut self, handler: BoxedHandler) -> Self {
        self.inner_mut().handlers.push(handler);
        self
    }

    /// Whether this matcher accepts the event.
    pub fn matches(&self, ctx: &Context) -> bool {
        self.inner.checks.iter().all(|check| check(ctx))
    }

    /// Whether an accepting match stops lower-priority matchers.
    pub fn is_blocking(&self) -> bool {
        self.inner.block
    }

    /// The matcher's priority.
    pub fn get_priority(&self) -> i32 {
        self.inner.priority
    }

    /// The matcher's name, if set.
    pub fn get_name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// The matcher's handlers, in registration order.
    pub fn handlers(&self) -> &[BoxedHandler] {
        &self.inner.handlers
    }

    /// Number of handlers.
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }

    /// Runs all handlers sequentially when the checks pass.
    ///
    /// Returns `true` if the matcher accepted the event. This is the
    /// synchronous-ordering path used by the Tower [`Service`] impl; the
    /// dispatcher schedules handlers concurrently with per-handler
    /// timeouts instead.
    pub async fn execute(&self, ctx: Arc<Context>) -> bool {
        if !self.matches(&ctx) {
            trace!(
                matcher = self.get_name().unwrap_or("unnamed"),
                "matcher check failed, skipping"
            );
            return false;
        }

        debug!(
            matcher = self.get_name().unwrap_or("unnamed"),
            handler_count = self.handler_count(),
            "matcher accepted, executing handlers"
        );

        for (index, handler) in self.inner.handlers.iter().enumerate() {
            if let Err(e) = (handler)(Arc::clone(&ctx)).await {
                tracing::warn!(
                    matcher = self.get_name().unwrap_or("unnamed"),
                    handler_index = index,
                    error = %e,
                    "handler failed"
                );
            }
        }

        true
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("name", &self.inner.name)
            .field("priority", &self.inner.priority)
            .field("block", &self.inner.block)
            .field("checks", &self.inner.checks.len())
            .field("handlers", &self.inner.handlers.len())
            .finish()
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

/// The response of a [`Matcher`] driven as a Tower service.
#[derive(Debug, Clone, Copy)]
pub struct MatcherResponse {
    /// Whether the matcher accepted the event and ran its handlers.
    pub matched: bool,
    /// Whether this matcher blocks lower-priority matchers.
    pub blocking: bool,
}

impl MatcherResponse {
    /// True when the match should stop further matchers.
    pub fn should_stop(&self) -> bool {
        self.matched && self.blocking
    }
}

/// Lets Tower middleware (timeouts, rate limits) wrap a matcher directly.
impl Service<Arc<Context>> for Matcher {
    type Response = MatcherResponse;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<Context>) -> Self::Future {
        let matcher = self.clone();

        Box::pin(async move {
            let matched = matcher.execute(ctx).await;
            Ok(MatcherResponse {
                matched,
                blocking: matcher.is_blocking(),
            })
        })
    }
}
