//! # Veranda API
//!
//! Outbound REST client for the Villa bot platform.
//!
//! [`ApiClient`] wraps one shared HTTP connection pool; [`VillaBot`] binds
//! it to a bot identity and exposes the typed API surface (messages,
//! members, rooms, groups, roles, emoticons, audit, images). `VillaBot`
//! implements the core [`Bot`](veranda_core::Bot) trait, so handlers can
//! take it through the `BotApi` extractor:
//!
//! ```rust,ignore
//! use veranda_api::VillaBot;
//! use veranda_core::{BotApi, EventCtx, SendMessageEvent};
//!
//! async fn handler(event: EventCtx<SendMessageEvent>, bot: BotApi<VillaBot>) {
//!     let villa = bot.get_villa(event.villa_id).await.ok();
//!     bot.send(event.root.as_ref(), "hi".into()).await.ok();
//! }
//! ```

pub mod bot;
pub mod client;
pub mod models;

pub use bot::VillaBot;
pub use client::{ApiClient, ApiClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use models::{
    ApiResponse, BotMemberAccessInfo, CheckMemberBotAccessTokenReturn, Color, Emoticon, Group,
    GroupRoom, Member, MemberBasic, MemberListReturn, MemberRole, MemberRoleDetail, Permission,
    PermissionDetail, Room, RoomDefaultNotifyType, RoomSort, RoomType, SendMsgAuthRange, Villa,
};
