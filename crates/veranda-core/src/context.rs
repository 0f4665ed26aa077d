//! Per-event execution context.

use std::sync::Arc;

use crate::bot::BoxedBot;
use crate::event::Event;

/// The context handed to matcher checks and handlers while one event is
/// dispatched.
///
/// One `Context` is created per decoded event and shared (via `Arc`)
/// between every handler that runs for it. It is read-only: matcher
/// predicates see the same immutable event, and the bot handle is safe for
/// concurrent use.
pub struct Context {
    event: Arc<Event>,
    bot: BoxedBot,
}

impl Context {
    /// Creates a context for one decoded event.
    pub fn new(event: Arc<Event>, bot: BoxedBot) -> Self {
        Self { event, bot }
    }

    /// The event being dispatched.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Shared handle to the event.
    pub fn event_arc(&self) -> Arc<Event> {
        Arc::clone(&self.event)
    }

    /// The API handle of the receiving bot.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Cloned API handle of the receiving bot.
    pub fn bot_arc(&self) -> BoxedBot {
        Arc::clone(&self.bot)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("event", &self.event.name())
            .field("bot_id", &self.bot.id())
            .finish()
    }
}
