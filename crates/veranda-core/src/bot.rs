//! The outbound API capability handlers call back into.
//!
//! The dispatch engine does not implement the platform REST API; it only
//! depends on this trait. The concrete client lives in `veranda-api`
//! (`VillaBot`); tests substitute mocks.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::event::Event;
use crate::message::{Message, MessageContentInfo};

/// The platform API surface available to handlers.
///
/// Implementations must be safe for concurrent use: one bot instance is
/// shared by every handler invocation for that bot, across in-flight
/// events.
#[async_trait]
pub trait Bot: Send + Sync {
    /// The bot's platform-assigned ID.
    fn id(&self) -> &str;

    /// Sends prepared message content into a room.
    ///
    /// Returns the platform-assigned message ID.
    async fn send_message(
        &self,
        villa_id: u64,
        room_id: u64,
        object_name: &str,
        msg_content: &MessageContentInfo,
    ) -> ApiResult<String>;

    /// Sends a message in reply to an event.
    ///
    /// The reply target (villa and room) is taken from the event; fails
    /// with `ApiError::MissingSession` for events that carry none.
    async fn send(&self, event: &Event, message: Message) -> ApiResult<String>;

    /// Returns self as `Arc<dyn Any>` for downcasting to the concrete type.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared, type-erased bot handle.
pub type BoxedBot = Arc<dyn Bot>;

/// Attempts to downcast a [`BoxedBot`] to its concrete type.
///
/// Used by the extractor system so handlers can receive `Arc<VillaBot>`
/// and reach platform-specific APIs.
pub fn downcast_bot<T: Bot + 'static>(bot: BoxedBot) -> Option<Arc<T>> {
    Arc::downcast::<T>(bot.as_any()).ok()
}
