//! # Veranda Core
//!
//! The core engine of the Veranda bot framework for the miHoYo Villa
//! platform.
//!
//! This crate holds everything the dispatch pipeline needs that is free of
//! network I/O:
//!
//! - **Events**: typed callback events and the decoder ([`Event`],
//!   [`decode_event`]) -- unknown event types decode to an `Unknown`
//!   variant instead of failing, so new platform events never break
//!   dispatch.
//! - **Messages**: the segment model and the wire content conversions
//!   ([`Message`], [`MessageSegment`], [`MessageContentInfo`]).
//! - **Signing**: webhook signature verification and outbound secret
//!   encryption ([`SignatureVerifier`], [`encrypt_secret`]).
//! - **Dispatch**: matchers, handlers and the dispatcher
//!   ([`Matcher`], [`Dispatcher`], [`MatchResult`]).
//! - **The API seam**: the [`Bot`] trait handlers call back into; the
//!   concrete REST client lives in `veranda-api`.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌────────────┐
//! │ webhook │───▶│ verifier │───▶│ decoder │───▶│ dispatcher │──▶ handlers
//! └─────────┘    └──────────┘    └─────────┘    └────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use veranda_core::{Dispatcher, EventCtx, SendMessageEvent, on_keyword};
//!
//! async fn greet(event: EventCtx<SendMessageEvent>) -> String {
//!     format!("hello, {}!", event.nickname)
//! }
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.add(on_keyword(["hello"]).priority(1).handler(greet));
//! ```

pub mod bot;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod extractor;
pub mod handler;
pub mod identity;
pub mod matcher;
pub mod matcher_builders;
pub mod message;
pub mod sign;

pub use bot::{Bot, BoxedBot, downcast_bot};
pub use context::Context;
pub use dispatcher::{DEFAULT_HANDLER_TIMEOUT, Dispatcher, MatchResult};
pub use error::{ApiError, ApiResult, AuthError, DecodeError, HandlerError, RegistryError};
pub use event::{
    AddQuickEmoticonEvent, AuditCallbackEvent, AuditResult, CreateRobotEvent, DeleteRobotEvent,
    Event, EventHeader, EventKind, EventType, FromEvent, JoinVillaEvent, Robot, SendMessageEvent,
    Template, TemplateCommand, UnknownEvent, decode_callback, decode_event,
};
pub use extractor::{BotApi, EventCtx, ExtractError, ExtractResult, FromContext, PlainText};
pub use handler::{BoxedHandler, HandleResponse, Handler, into_handler};
pub use identity::BotIdentity;
pub use matcher::{CheckFn, Matcher, MatcherResponse};
pub use matcher_builders::{
    on_endswith, on_event, on_join_villa, on_keyword, on_message, on_quick_emoticon, on_regex,
    on_startswith,
};
pub use message::{
    Message, MessageContent, MessageContentInfo, MessageSegment, QuoteInfo, TextContent,
};
pub use sign::{SignatureVerifier, encrypt_secret, normalize_pub_key, signing_payload};

/// Prelude for common imports.
pub mod prelude {
    pub use super::bot::{Bot, BoxedBot};
    pub use super::context::Context;
    pub use super::dispatcher::Dispatcher;
    pub use super::event::{
        AddQuickEmoticonEvent, Event, EventType, JoinVillaEvent, SendMessageEvent,
    };
    pub use super::extractor::{BotApi, EventCtx, PlainText};
    pub use super::identity::BotIdentity;
    pub use super::matcher::Matcher;
    pub use super::matcher_builders::{
        on_endswith, on_event, on_join_villa, on_keyword, on_message, on_quick_emoticon, on_regex,
        on_startswith,
    };
    pub use super::message::{Message, MessageSegment};
}
