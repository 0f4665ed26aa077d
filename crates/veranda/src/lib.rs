//! # Veranda
//!
//! A bot framework for the miHoYo Villa ("大别野") platform.
//!
//! Veranda receives the platform's webhook callbacks, verifies their RSA
//! signatures, decodes them into typed events, and routes each event
//! through priority-ordered matchers to async handlers. Handlers reply
//! through the bundled REST client.
//!
//! ```rust,ignore
//! use veranda::prelude::*;
//!
//! async fn greet(event: EventCtx<SendMessageEvent>) -> String {
//!     format!("hello, {}!", event.nickname)
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = VillaRuntime::new();
//!     runtime.register_from_config("bot_abc", vec![
//!         on_keyword(["hello"]).handler(greet),
//!     ])?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! The layers are published separately as well:
//!
//! - [`veranda_core`] -- events, messages, signing, matchers, dispatch;
//! - [`veranda_api`] -- the platform REST client ([`VillaBot`]);
//! - [`veranda_runtime`] -- registry, webhook engine/server, config,
//!   logging.

pub use veranda_api as api;
pub use veranda_core as core;
pub use veranda_runtime as runtime;

pub use veranda_api::{ApiClient, VillaBot};
pub use veranda_core::{
    ApiError, ApiResult, AuthError, Bot, BotApi, BotIdentity, BoxedBot, Context, DecodeError,
    Dispatcher, Event, EventCtx, EventKind, EventType, HandlerError, Matcher, Message,
    MessageSegment, PlainText, RegistryError, SendMessageEvent,
};
pub use veranda_runtime::{VerandaConfig, VillaRuntime, WebhookOutcome};

/// Prelude for common imports.
pub mod prelude {
    pub use veranda_api::VillaBot;
    pub use veranda_core::prelude::*;
    pub use veranda_runtime::VillaRuntime;
}
