//! Parameter extraction for handler functions.
//!
//! Handlers declare what they need as typed parameters, and the framework
//! pulls those values out of the [`Context`]:
//!
//! ```rust,ignore
//! async fn greet(event: EventCtx<SendMessageEvent>, bot: BotApi<VillaBot>) {
//!     println!("{} said {}", event.nickname, event.message.plain_text());
//! }
//! ```
//!
//! An extractor that fails skips the handler (the surrounding matcher
//! already filtered the event, so a miss here means the handler asked for
//! something this event does not carry).

use std::ops::Deref;
use std::sync::Arc;

use thiserror::Error;

use crate::bot::{Bot, BoxedBot, downcast_bot};
use crate::context::Context;
use crate::event::{Event, FromEvent};

/// Result type for extraction.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Why an extractor did not produce a value.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The event is not of the requested kind.
    #[error("event does not match the requested type")]
    EventMismatch,

    /// The bot is not of the requested concrete type.
    #[error("bot is not a {expected}")]
    BotTypeMismatch {
        /// The concrete type the handler asked for.
        expected: &'static str,
    },

    /// The event carries no message text.
    #[error("event carries no message text")]
    NoText,
}

/// Extracts a value from the dispatch context.
pub trait FromContext: Sized + Send {
    /// Attempts the extraction.
    fn from_context(ctx: &Context) -> ExtractResult<Self>;
}

// ============================================================================
// EventCtx
// ============================================================================

/// Extracts a typed event payload, keeping a handle on the full event.
///
/// `Deref`s to the payload; `root` exposes the decoded event (header
/// included) for passing to APIs like [`Bot::send`](crate::Bot::send).
#[derive(Clone)]
pub struct EventCtx<T> {
    data: T,
    /// The full decoded event.
    pub root: Arc<Event>,
}

impl<T> EventCtx<T> {
    /// The extracted payload.
    pub fn data(&self) -> &T {
        &self.data
    }
}

impl<T> Deref for EventCtx<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for EventCtx<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCtx").field("data", &self.data).finish()
    }
}

impl<T: FromEvent + Send> FromContext for EventCtx<T> {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        T::from_event(ctx.event())
            .map(|data| Self {
                data,
                root: ctx.event_arc(),
            })
            .ok_or(ExtractError::EventMismatch)
    }
}

// ============================================================================
// Bot extractors
// ============================================================================

/// Extracts the bot as its concrete type.
///
/// `Deref`s to `T`, giving handlers the full platform API surface rather
/// than the minimal [`Bot`] trait.
#[derive(Clone)]
pub struct BotApi<T: Bot>(pub Arc<T>);

impl<T: Bot> Deref for BotApi<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Bot + 'static> FromContext for BotApi<T> {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        downcast_bot::<T>(ctx.bot_arc())
            .map(BotApi)
            .ok_or(ExtractError::BotTypeMismatch {
                expected: std::any::type_name::<T>(),
            })
    }
}

impl FromContext for BoxedBot {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(ctx.bot_arc())
    }
}

impl FromContext for Arc<Event> {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(ctx.event_arc())
    }
}

// ============================================================================
// PlainText
// ============================================================================

/// Extracts the plain text of a message event.
///
/// Fails (skipping the handler) for events that carry no message.
#[derive(Debug, Clone)]
pub struct PlainText(pub String);

impl Deref for PlainText {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for PlainText {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        ctx.event()
            .message()
            .map(|m| Self(m.plain_text()))
            .ok_or(ExtractError::NoText)
    }
}

impl<T: FromContext> FromContext for Option<T> {
    fn from_context(ctx: &Context) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).ok())
    }
}
