//! Message model for the Villa platform.
//!
//! A [`Message`] is an ordered list of [`MessageSegment`]s -- plain text,
//! mentions, links, images and so on. Handlers receive messages in this
//! segment form (rebuilt from the wire representation), and build replies
//! the same way:
//!
//! ```rust,ignore
//! use veranda_core::Message;
//!
//! let reply = Message::new()
//!     .mention_user(123456, Some("Traveler"), None)
//!     .text(" welcome aboard!");
//! ```
//!
//! The wire representation (`MessageContentInfo` with UTF-16 entity offsets)
//! lives in [`content`], together with the conversions in both directions.

pub mod content;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use content::{
    BadgeInfo, Entity, ImageContent, ImageInfo, ImageSize, MentionKind, MentionedInfo,
    MessageContent, MessageContentInfo, PostContent, PreviewLinkInfo, QuoteInfo, TextContent,
    TextEntity,
};

// ============================================================================
// Segment payloads
// ============================================================================

/// Plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    /// The text content.
    pub content: String,
}

/// An @-mention of a robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionRobotSegment {
    /// Mentioned robot ID.
    pub bot_id: String,
    /// Display name rendered after the `@`.
    pub bot_name: String,
}

/// An @-mention of a user.
///
/// Either `user_name` or `villa_id` must be present when sending: with only
/// a villa the display name is resolved through the member API before the
/// message goes out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionUserSegment {
    /// Mentioned user ID.
    pub user_id: u64,
    /// Display name, if already known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Villa used to resolve the display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub villa_id: Option<u64>,
}

/// An @-mention of everyone in the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionAllSegment {
    /// Display text rendered after the `@`.
    pub show_text: String,
}

/// A `#room` link into a villa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomLinkSegment {
    /// Target villa.
    pub villa_id: u64,
    /// Target room.
    pub room_id: u64,
    /// Display name, resolved through the room API before sending when
    /// absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
}

/// A hyperlink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSegment {
    /// Link target.
    pub url: String,
    /// Display text.
    pub show_text: String,
    /// Whether opening the link attaches a member access token.
    #[serde(default)]
    pub requires_bot_access_token: bool,
}

/// An image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSegment {
    /// Image URL (platform image hosting).
    pub url: String,
    /// Pixel width, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// File size in bytes, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// A quote reference to an earlier message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSegment {
    /// Quoted message ID.
    pub quoted_message_id: String,
    /// Quoted message send time.
    pub quoted_message_send_time: i64,
    /// Root of the quote chain.
    pub original_message_id: String,
    /// Send time of the chain root.
    pub original_message_send_time: i64,
}

/// A forwarded community post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSegment {
    /// Post ID.
    pub post_id: String,
}

/// A preview card rendered under the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewLinkSegment {
    /// Icon shown on the card.
    pub icon_url: String,
    /// Cover image.
    pub image_url: String,
    /// Whether the link stays inside the platform.
    pub is_internal_link: bool,
    /// Card title.
    pub title: String,
    /// Card body text.
    pub content: String,
    /// Link target.
    pub url: String,
    /// Source attribution line.
    pub source_name: String,
}

/// A badge rendered under the message. Not sendable on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeSegment {
    /// Badge icon.
    pub icon_url: String,
    /// Badge text.
    pub text: String,
    /// Badge link target.
    pub url: String,
}

// ============================================================================
// MessageSegment
// ============================================================================

/// One unit of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageSegment {
    /// Plain text.
    Text(TextSegment),
    /// @-mention of a robot.
    MentionRobot(MentionRobotSegment),
    /// @-mention of a user.
    MentionUser(MentionUserSegment),
    /// @-mention of everyone.
    MentionAll(MentionAllSegment),
    /// `#room` link.
    RoomLink(RoomLinkSegment),
    /// Hyperlink.
    Link(LinkSegment),
    /// Image.
    Image(ImageSegment),
    /// Quote of an earlier message.
    Quote(QuoteSegment),
    /// Forwarded post.
    Post(PostSegment),
    /// Preview card.
    PreviewLink(PreviewLinkSegment),
    /// Badge.
    Badge(BadgeSegment),
}

impl MessageSegment {
    /// Creates a plain text segment.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(TextSegment {
            content: content.into(),
        })
    }

    /// Creates a robot mention segment.
    pub fn mention_robot(bot_id: impl Into<String>, bot_name: impl Into<String>) -> Self {
        Self::MentionRobot(MentionRobotSegment {
            bot_id: bot_id.into(),
            bot_name: bot_name.into(),
        })
    }

    /// Creates a user mention segment.
    pub fn mention_user(user_id: u64, user_name: Option<String>, villa_id: Option<u64>) -> Self {
        Self::MentionUser(MentionUserSegment {
            user_id,
            user_name,
            villa_id,
        })
    }

    /// Creates an @-everyone segment with the default display text.
    pub fn mention_all() -> Self {
        Self::MentionAll(MentionAllSegment {
            show_text: "全体成员".to_string(),
        })
    }

    /// Creates a room link segment.
    pub fn room_link(villa_id: u64, room_id: u64) -> Self {
        Self::RoomLink(RoomLinkSegment {
            villa_id,
            room_id,
            room_name: None,
        })
    }

    /// Creates a link segment. The display text defaults to the URL.
    pub fn link(url: impl Into<String>, show_text: Option<String>) -> Self {
        let url = url.into();
        let show_text = show_text.unwrap_or_else(|| url.clone());
        Self::Link(LinkSegment {
            url,
            show_text,
            requires_bot_access_token: false,
        })
    }

    /// Creates an image segment.
    pub fn image(url: impl Into<String>) -> Self {
        Self::Image(ImageSegment {
            url: url.into(),
            width: None,
            height: None,
            file_size: None,
        })
    }

    /// Creates a quote segment referencing a message.
    pub fn quote(message_id: impl Into<String>, message_send_time: i64) -> Self {
        let id = message_id.into();
        Self::Quote(QuoteSegment {
            quoted_message_id: id.clone(),
            quoted_message_send_time: message_send_time,
            original_message_id: id,
            original_message_send_time: message_send_time,
        })
    }

    /// Creates a post forward segment.
    pub fn post(post_id: impl Into<String>) -> Self {
        Self::Post(PostSegment {
            post_id: post_id.into(),
        })
    }

    /// Returns the plain text content for text segments.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(&t.content),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(t) => write!(f, "{}", t.content),
            Self::MentionRobot(m) => write!(f, "@{}", m.bot_name),
            Self::MentionUser(m) => match &m.user_name {
                Some(name) => write!(f, "@{name}"),
                None => write!(f, "@{}", m.user_id),
            },
            Self::MentionAll(m) => write!(f, "@{}", m.show_text),
            Self::RoomLink(r) => match &r.room_name {
                Some(name) => write!(f, "#{name}"),
                None => write!(f, "#{}", r.room_id),
            },
            Self::Link(l) => write!(f, "{}", l.show_text),
            Self::Image(i) => write!(f, "[图片:{}]", i.url),
            Self::Quote(q) => write!(f, "[引用:{}]", q.quoted_message_id),
            Self::Post(p) => write!(f, "[帖子:{}]", p.post_id),
            Self::PreviewLink(p) => write!(f, "[卡片:{}]", p.title),
            Self::Badge(b) => write!(f, "[徽标:{}]", b.text),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// An ordered sequence of message segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message {
    segments: Vec<MessageSegment>,
}

impl Message {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plain text segment (builder style).
    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.segments.push(MessageSegment::text(content));
        self
    }

    /// Appends a user mention (builder style).
    pub fn mention_user(
        mut self,
        user_id: u64,
        user_name: Option<String>,
        villa_id: Option<u64>,
    ) -> Self {
        self.segments
            .push(MessageSegment::mention_user(user_id, user_name, villa_id));
        self
    }

    /// Appends a robot mention (builder style).
    pub fn mention_robot(
        mut self,
        bot_id: impl Into<String>,
        bot_name: impl Into<String>,
    ) -> Self {
        self.segments
            .push(MessageSegment::mention_robot(bot_id, bot_name));
        self
    }

    /// Appends an @-everyone mention (builder style).
    pub fn mention_all(mut self) -> Self {
        self.segments.push(MessageSegment::mention_all());
        self
    }

    /// Appends a room link (builder style).
    pub fn room_link(mut self, villa_id: u64, room_id: u64) -> Self {
        self.segments
            .push(MessageSegment::room_link(villa_id, room_id));
        self
    }

    /// Appends a link (builder style).
    pub fn link(mut self, url: impl Into<String>, show_text: Option<String>) -> Self {
        self.segments.push(MessageSegment::link(url, show_text));
        self
    }

    /// Appends an image (builder style).
    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.segments.push(MessageSegment::image(url));
        self
    }

    /// Appends a quote (builder style).
    pub fn quote(mut self, message_id: impl Into<String>, message_send_time: i64) -> Self {
        self.segments
            .push(MessageSegment::quote(message_id, message_send_time));
        self
    }

    /// Appends a post forward (builder style).
    pub fn post(mut self, post_id: impl Into<String>) -> Self {
        self.segments.push(MessageSegment::post(post_id));
        self
    }

    /// Appends a segment in place.
    pub fn push(&mut self, segment: impl Into<MessageSegment>) {
        self.segments.push(segment.into());
    }

    /// Inserts a segment at the given position.
    pub fn insert(&mut self, index: usize, segment: impl Into<MessageSegment>) {
        self.segments.insert(index, segment.into());
    }

    /// The segments of this message, in order.
    pub fn segments(&self) -> &[MessageSegment] {
        &self.segments
    }

    /// Mutable access to the segments.
    pub fn segments_mut(&mut self) -> &mut Vec<MessageSegment> {
        &mut self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the message has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Concatenated content of all text segments.
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(MessageSegment::as_text)
            .collect()
    }

    /// Whether the plain text part starts with the given prefix.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.plain_text().starts_with(prefix)
    }

    /// Whether the plain text part ends with the given suffix.
    pub fn ends_with(&self, suffix: &str) -> bool {
        self.plain_text().ends_with(suffix)
    }

    /// Whether the plain text part contains the given substring.
    pub fn contains(&self, keyword: &str) -> bool {
        self.plain_text().contains(keyword)
    }

    /// Matches the plain text part against a regular expression.
    pub fn is_match(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.plain_text())
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::new().text(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::new().text(text)
    }
}

impl From<MessageSegment> for Message {
    fn from(segment: MessageSegment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

impl FromIterator<MessageSegment> for Message {
    fn from_iter<I: IntoIterator<Item = MessageSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

// Display joins segment renderings without separators, matching how the
// platform lays the message out.
impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
