//! Wire representation of message content.
//!
//! The platform exchanges message bodies as a `MessageContentInfo` envelope:
//! plain text plus a list of entities addressing ranges of that text by
//! UTF-16 code-unit offsets. This module defines that envelope and converts
//! between it and the segment-based [`Message`](super::Message) model:
//!
//! - inbound, [`MessageContentInfo::to_message`] rebuilds segments from the
//!   text and its entities;
//! - outbound, [`Message::to_content_info`](super::Message::to_content_info)
//!   lays segments back out into text + entities and picks the matching
//!   `object_name`.

use serde::{Deserialize, Serialize};

use super::{Message, MessageSegment};
use crate::error::ApiError;

// ============================================================================
// Envelope
// ============================================================================

/// The message content envelope carried in send requests and callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContentInfo {
    /// The content body.
    pub content: MessageContent,
    /// Mention summary, present when the message mentions anyone.
    #[serde(
        rename = "mentionedInfo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mentioned_info: Option<MentionedInfo>,
    /// Quote reference, present when the message replies to another.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<QuoteInfo>,
}

/// Content body variants, distinguished by their mandatory fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Text with entities (`MHY:Text`).
    Text(TextContent),
    /// A single image (`MHY:Image`).
    Image(ImageContent),
    /// A forwarded post (`MHY:Post`).
    Post(PostContent),
}

impl MessageContent {
    /// The platform `object_name` for this content kind.
    pub fn object_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "MHY:Text",
            Self::Image(_) => "MHY:Image",
            Self::Post(_) => "MHY:Post",
        }
    }
}

/// Text body: display text plus entities over UTF-16 ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// The rendered text.
    pub text: String,
    /// Entities addressing ranges of `text`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<TextEntity>,
    /// Attached images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageInfo>>,
    /// Preview card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_link: Option<PreviewLinkInfo>,
    /// Badge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<BadgeInfo>,
}

/// Image body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Image URL.
    pub url: String,
    /// Pixel dimensions, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
    /// File size in bytes, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Post body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostContent {
    /// Post ID.
    pub post_id: String,
}

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
}

/// An attached image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Image URL.
    pub url: String,
    /// Pixel dimensions, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
    /// File size in bytes, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Preview card payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewLinkInfo {
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

/// Badge payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeInfo {
    /// Badge icon.
    pub icon_url: String,
    /// Badge text.
    pub text: String,
    /// Badge link target.
    pub url: String,
}

// ============================================================================
// Entities
// ============================================================================

/// An entity addressing `[offset, offset + length)` in UTF-16 code units of
/// the containing text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEntity {
    /// Start offset in UTF-16 code units.
    pub offset: usize,
    /// Length in UTF-16 code units.
    pub length: usize,
    /// What the range means.
    pub entity: Entity,
}

/// Entity kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    /// The range mentions a robot.
    MentionedRobot {
        /// Mentioned robot ID.
        bot_id: String,
    },
    /// The range mentions a user.
    MentionedUser {
        /// Mentioned user ID (stringly typed on the wire).
        user_id: String,
    },
    /// The range mentions everyone.
    MentionAll,
    /// The range links a room.
    VillaRoomLink {
        /// Target villa (stringly typed on the wire).
        villa_id: String,
        /// Target room (stringly typed on the wire).
        room_id: String,
    },
    /// The range is a hyperlink.
    Link {
        /// Link target.
        url: String,
        /// Whether opening the link attaches a member access token.
        #[serde(default)]
        requires_bot_access_token: bool,
    },
}

/// Whether a message mentions everyone or specific members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MentionKind {
    /// The whole room.
    All,
    /// Listed members only.
    Part,
}

impl From<MentionKind> for u8 {
    fn from(kind: MentionKind) -> u8 {
        match kind {
            MentionKind::All => 1,
            MentionKind::Part => 2,
        }
    }
}

impl TryFrom<u8> for MentionKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::All),
            2 => Ok(Self::Part),
            other => Err(format!("invalid mention kind: {other}")),
        }
    }
}

/// Mention summary attached to outbound messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionedInfo {
    /// Mention scope.
    #[serde(rename = "type")]
    pub kind: MentionKind,
    /// Mentioned member/robot IDs.
    #[serde(rename = "userIdList", default)]
    pub user_id_list: Vec<String>,
}

/// Quote reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteInfo {
    /// Quoted message ID.
    pub quoted_message_id: String,
    /// Quoted message send time.
    pub quoted_message_send_time: i64,
    /// Root of the quote chain.
    pub original_message_id: String,
    /// Send time of the chain root.
    pub original_message_send_time: i64,
}

// ============================================================================
// UTF-16 helpers
// ============================================================================

/// Length of a string in UTF-16 code units, the unit entity offsets are
/// measured in.
pub(crate) fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Decodes a UTF-16 code-unit range back into a string, clamping
/// out-of-bounds ranges instead of failing on hostile offsets.
fn utf16_slice(units: &[u16], start: usize, end: usize) -> String {
    let start = start.min(units.len());
    let end = end.clamp(start, units.len());
    String::from_utf16_lossy(&units[start..end])
}

/// Strips the mention sigil and trailing padding from an entity's display
/// text (`"@Pallas "` -> `"Pallas"`).
fn display_name(covered: &str, sigil: char) -> String {
    covered.trim_start_matches(sigil).trim_end().to_string()
}

// ============================================================================
// Inbound: wire -> segments
// ============================================================================

impl MessageContentInfo {
    /// Rebuilds the segment view of an inbound message.
    ///
    /// Entities are applied over the text by UTF-16 offsets; uncovered gaps
    /// become text segments. A quote reference becomes a leading quote
    /// segment. Display names are recovered from the covered text since the
    /// wire entities carry IDs only.
    pub fn to_message(&self, villa_id: Option<u64>) -> Message {
        let mut message = Message::new();

        if let Some(quote) = &self.quote {
            message.push(MessageSegment::quote(
                quote.quoted_message_id.clone(),
                quote.quoted_message_send_time,
            ));
        }

        match &self.content {
            MessageContent::Text(text) => {
                Self::apply_entities(&mut message, text, villa_id);
                if let Some(images) = &text.images {
                    for image in images {
                        message.push(MessageSegment::Image(super::ImageSegment {
                            url: image.url.clone(),
                            width: image.size.map(|s| s.width),
                            height: image.size.map(|s| s.height),
                            file_size: image.file_size,
                        }));
                    }
                }
            }
            MessageContent::Image(image) => {
                message.push(MessageSegment::Image(super::ImageSegment {
                    url: image.url.clone(),
                    width: image.size.map(|s| s.width),
                    height: image.size.map(|s| s.height),
                    file_size: image.file_size,
                }));
            }
            MessageContent::Post(post) => {
                message.push(MessageSegment::post(post.post_id.clone()));
            }
        }

        message
    }

    fn apply_entities(message: &mut Message, text: &TextContent, villa_id: Option<u64>) {
        if text.entities.is_empty() {
            if !text.text.is_empty() {
                message.push(MessageSegment::text(text.text.clone()));
            }
            return;
        }

        let units: Vec<u16> = text.text.encode_utf16().collect();
        let mut entities: Vec<&TextEntity> = text.entities.iter().collect();
        entities.sort_by_key(|e| e.offset);

        let mut cursor = 0usize;
        for entity in entities {
            if entity.offset > cursor {
                let gap = utf16_slice(&units, cursor, entity.offset);
                if !gap.is_empty() {
                    message.push(MessageSegment::text(gap));
                }
            }
            let covered = utf16_slice(&units, entity.offset, entity.offset + entity.length);
            match &entity.entity {
                Entity::MentionedRobot { bot_id } => {
                    message.push(MessageSegment::mention_robot(
                        bot_id.clone(),
                        display_name(&covered, '@'),
                    ));
                }
                Entity::MentionedUser { user_id } => {
                    let user_id = user_id.parse().unwrap_or_default();
                    let name = display_name(&covered, '@');
                    let name = (!name.is_empty()).then_some(name);
                    message.push(MessageSegment::mention_user(user_id, name, villa_id));
                }
                Entity::MentionAll => {
                    message.push(MessageSegment::MentionAll(super::MentionAllSegment {
                        show_text: display_name(&covered, '@'),
                    }));
                }
                Entity::VillaRoomLink { villa_id, room_id } => {
                    let name = display_name(&covered, '#');
                    message.push(MessageSegment::RoomLink(super::RoomLinkSegment {
                        villa_id: villa_id.parse().unwrap_or_default(),
                        room_id: room_id.parse().unwrap_or_default(),
                        room_name: (!name.is_empty()).then_some(name),
                    }));
                }
                Entity::Link {
                    url,
                    requires_bot_access_token,
                } => {
                    message.push(MessageSegment::Link(super::LinkSegment {
                        url: url.clone(),
                        show_text: covered,
                        requires_bot_access_token: *requires_bot_access_token,
                    }));
                }
            }
            cursor = entity.offset + entity.length;
        }

        if cursor < units.len() {
            let tail = utf16_slice(&units, cursor, units.len());
            if !tail.is_empty() {
                message.push(MessageSegment::text(tail));
            }
        }
    }
}

// ============================================================================
// Outbound: segments -> wire
// ============================================================================

impl Message {
    /// Lays the message out into wire content.
    ///
    /// Mention and room-link display names must already be resolved; the
    /// bot resolves missing names through the platform API before calling
    /// this. Fails with [`ApiError::EmptyMessage`] when nothing sendable
    /// remains.
    pub fn to_content_info(&self) -> Result<MessageContentInfo, ApiError> {
        let quote = self.segments().iter().find_map(|seg| match seg {
            MessageSegment::Quote(q) => Some(QuoteInfo {
                quoted_message_id: q.quoted_message_id.clone(),
                quoted_message_send_time: q.quoted_message_send_time,
                original_message_id: q.original_message_id.clone(),
                original_message_send_time: q.original_message_send_time,
            }),
            _ => None,
        });
        let badge = self.segments().iter().find_map(|seg| match seg {
            MessageSegment::Badge(b) => Some(BadgeInfo {
                icon_url: b.icon_url.clone(),
                text: b.text.clone(),
                url: b.url.clone(),
            }),
            _ => None,
        });
        let preview_link = self.segments().iter().find_map(|seg| match seg {
            MessageSegment::PreviewLink(p) => Some(PreviewLinkInfo {
                icon_url: p.icon_url.clone(),
                image_url: p.image_url.clone(),
                is_internal_link: p.is_internal_link,
                title: p.title.clone(),
                content: p.content.clone(),
                url: p.url.clone(),
                source_name: p.source_name.clone(),
            }),
            _ => None,
        });
        let post = self.segments().iter().find_map(|seg| match seg {
            MessageSegment::Post(p) => Some(p.post_id.clone()),
            _ => None,
        });
        let images: Vec<ImageInfo> = self
            .segments()
            .iter()
            .filter_map(|seg| match seg {
                MessageSegment::Image(i) => Some(ImageInfo {
                    url: i.url.clone(),
                    size: match (i.width, i.height) {
                        (Some(width), Some(height)) => Some(ImageSize { width, height }),
                        _ => None,
                    },
                    file_size: i.file_size,
                }),
                _ => None,
            })
            .collect();
        let images = (!images.is_empty()).then_some(images);

        let mut text = String::new();
        let mut offset = 0usize;
        let mut entities: Vec<TextEntity> = Vec::new();
        let mut mention_kind = MentionKind::Part;
        let mut user_id_list: Vec<String> = Vec::new();

        for segment in self.segments() {
            let seg_text = match segment {
                MessageSegment::Text(t) => t.content.clone(),
                MessageSegment::MentionAll(m) => {
                    let seg_text = format!("@{} ", m.show_text);
                    entities.push(TextEntity {
                        offset,
                        length: utf16_len(&seg_text),
                        entity: Entity::MentionAll,
                    });
                    mention_kind = MentionKind::All;
                    seg_text
                }
                MessageSegment::MentionRobot(m) => {
                    let seg_text = format!("@{} ", m.bot_name);
                    entities.push(TextEntity {
                        offset,
                        length: utf16_len(&seg_text),
                        entity: Entity::MentionedRobot {
                            bot_id: m.bot_id.clone(),
                        },
                    });
                    user_id_list.push(m.bot_id.clone());
                    seg_text
                }
                MessageSegment::MentionUser(m) => {
                    let name = m
                        .user_name
                        .clone()
                        .unwrap_or_else(|| m.user_id.to_string());
                    let seg_text = format!("@{name} ");
                    entities.push(TextEntity {
                        offset,
                        length: utf16_len(&seg_text),
                        entity: Entity::MentionedUser {
                            user_id: m.user_id.to_string(),
                        },
                    });
                    user_id_list.push(m.user_id.to_string());
                    seg_text
                }
                MessageSegment::RoomLink(r) => {
                    let name = r.room_name.clone().unwrap_or_else(|| r.room_id.to_string());
                    let seg_text = format!("#{name} ");
                    entities.push(TextEntity {
                        offset,
                        length: utf16_len(&seg_text),
                        entity: Entity::VillaRoomLink {
                            villa_id: r.villa_id.to_string(),
                            room_id: r.room_id.to_string(),
                        },
                    });
                    seg_text
                }
                MessageSegment::Link(l) => {
                    entities.push(TextEntity {
                        offset,
                        length: utf16_len(&l.show_text),
                        entity: Entity::Link {
                            url: l.url.clone(),
                            requires_bot_access_token: l.requires_bot_access_token,
                        },
                    });
                    l.show_text.clone()
                }
                // Non-textual segments were collected above.
                MessageSegment::Image(_)
                | MessageSegment::Quote(_)
                | MessageSegment::Post(_)
                | MessageSegment::PreviewLink(_)
                | MessageSegment::Badge(_) => continue,
            };
            offset += utf16_len(&seg_text);
            text.push_str(&seg_text);
        }

        let mentioned_info = (mention_kind == MentionKind::All || !user_id_list.is_empty())
            .then_some(MentionedInfo {
                kind: mention_kind,
                user_id_list,
            });

        let content = if text.is_empty() && entities.is_empty() {
            if let Some(mut images) = images {
                if images.len() > 1 {
                    MessageContent::Text(TextContent {
                        text: "\u{200b}".to_string(),
                        entities,
                        images: Some(images),
                        preview_link,
                        badge,
                    })
                } else {
                    let image = images.remove(0);
                    MessageContent::Image(ImageContent {
                        url: image.url,
                        size: image.size,
                        file_size: image.file_size,
                    })
                }
            } else if preview_link.is_some() {
                MessageContent::Text(TextContent {
                    text: "\u{200b}".to_string(),
                    entities,
                    images: None,
                    preview_link,
                    badge,
                })
            } else if let Some(post_id) = post {
                MessageContent::Post(PostContent { post_id })
            } else {
                return Err(ApiError::EmptyMessage);
            }
        } else {
            MessageContent::Text(TextContent {
                text,
                entities,
                images,
                preview_link,
                badge,
            })
        };

        Ok(MessageContentInfo {
            content,
            mentioned_info,
            quote,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_content(text: &str, entities: Vec<TextEntity>) -> MessageContentInfo {
        MessageContentInfo {
            content: MessageContent::Text(TextContent {
                text: text.to_string(),
                entities,
                images: None,
                preview_link: None,
                badge: None,
            }),
            mentioned_info: None,
            quote: None,
        }
    }

    #[test]
    fn inbound_robot_mention_splits_text() {
        // "@Pallas hello" -- the entity covers "@Pallas " (8 UTF-16 units).
        let info = text_content(
            "@Pallas hello",
            vec![TextEntity {
                offset: 0,
                length: 8,
                entity: Entity::MentionedRobot {
                    bot_id: "bot_1".into(),
                },
            }],
        );
        let message = info.to_message(Some(100));
        let segments = message.segments();
        assert_eq!(segments.len(), 2);
        match &segments[0] {
            MessageSegment::MentionRobot(m) => {
                assert_eq!(m.bot_id, "bot_1");
                assert_eq!(m.bot_name, "Pallas");
            }
            other => panic!("unexpected segment: {other:?}"),
        }
        assert_eq!(message.plain_text(), "hello");
    }

    #[test]
    fn inbound_offsets_are_utf16_units() {
        // The leading CJK text is 2 UTF-16 units; "@某人 " covers 4.
        let info = text_content(
            "你好@某人 在吗",
            vec![TextEntity {
                offset: 2,
                length: 4,
                entity: Entity::MentionedUser {
                    user_id: "42".into(),
                },
            }],
        );
        let message = info.to_message(Some(100));
        let segments = message.segments();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].as_text(), Some("你好"));
        match &segments[1] {
            MessageSegment::MentionUser(m) => {
                assert_eq!(m.user_id, 42);
                assert_eq!(m.user_name.as_deref(), Some("某人"));
                assert_eq!(m.villa_id, Some(100));
            }
            other => panic!("unexpected segment: {other:?}"),
        }
        assert_eq!(segments[2].as_text(), Some("在吗"));
    }

    #[test]
    fn inbound_quote_becomes_leading_segment() {
        let mut info = text_content("hi", vec![]);
        info.quote = Some(QuoteInfo {
            quoted_message_id: "msg_1".into(),
            quoted_message_send_time: 1000,
            original_message_id: "msg_1".into(),
            original_message_send_time: 1000,
        });
        let message = info.to_message(None);
        assert!(matches!(message.segments()[0], MessageSegment::Quote(_)));
        assert_eq!(message.plain_text(), "hi");
    }

    #[test]
    fn inbound_hostile_offsets_do_not_panic() {
        let info = text_content(
            "short",
            vec![TextEntity {
                offset: 3,
                length: 1000,
                entity: Entity::MentionAll,
            }],
        );
        let message = info.to_message(None);
        assert!(!message.is_empty());
    }

    #[test]
    fn outbound_layout_round_trips() {
        let message = Message::new()
            .mention_user(42, Some("某人".into()), None)
            .text("回来了吗");
        let info = message.to_content_info().unwrap();

        let MessageContent::Text(text) = &info.content else {
            panic!("expected text content");
        };
        assert_eq!(text.text, "@某人 回来了吗");
        assert_eq!(text.entities.len(), 1);
        assert_eq!(text.entities[0].offset, 0);
        assert_eq!(text.entities[0].length, 4);

        let mentioned = info.mentioned_info.as_ref().unwrap();
        assert_eq!(mentioned.kind, MentionKind::Part);
        assert_eq!(mentioned.user_id_list, vec!["42".to_string()]);

        // And back through the inbound path.
        let rebuilt = info.to_message(None);
        assert_eq!(rebuilt.plain_text(), "回来了吗");
    }

    #[test]
    fn outbound_mention_all_sets_kind() {
        let message = Message::new().mention_all().text("集合");
        let info = message.to_content_info().unwrap();
        assert_eq!(info.mentioned_info.unwrap().kind, MentionKind::All);
    }

    #[test]
    fn outbound_single_image_is_image_content() {
        let message = Message::new().image("https://example.com/a.png");
        let info = message.to_content_info().unwrap();
        assert!(matches!(info.content, MessageContent::Image(_)));
        assert_eq!(info.content.object_name(), "MHY:Image");
    }

    #[test]
    fn outbound_multiple_images_keep_text_content() {
        let message = Message::new()
            .image("https://example.com/a.png")
            .image("https://example.com/b.png");
        let info = message.to_content_info().unwrap();
        let MessageContent::Text(text) = &info.content else {
            panic!("expected text content");
        };
        assert_eq!(text.text, "\u{200b}");
        assert_eq!(text.images.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn outbound_post_only() {
        let message = Message::new().post("123456");
        let info = message.to_content_info().unwrap();
        assert!(matches!(info.content, MessageContent::Post(_)));
        assert_eq!(info.content.object_name(), "MHY:Post");
    }

    #[test]
    fn outbound_empty_message_is_an_error() {
        let err = Message::new().to_content_info().unwrap_err();
        assert!(matches!(err, ApiError::EmptyMessage));
    }

    #[test]
    fn envelope_serde_uses_platform_field_names() {
        let message = Message::new().mention_all().text("hi");
        let info = message.to_content_info().unwrap();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["mentionedInfo"]["type"], 1);
        assert!(json["mentionedInfo"]["userIdList"].is_array());
        assert_eq!(json["content"]["entities"][0]["entity"]["type"], "mention_all");
    }

    #[test]
    fn content_deserializes_each_kind() {
        let text: MessageContent =
            serde_json::from_value(serde_json::json!({"text": "hi", "entities": []})).unwrap();
        assert!(matches!(text, MessageContent::Text(_)));

        let image: MessageContent =
            serde_json::from_value(serde_json::json!({"url": "https://example.com/a.png"}))
                .unwrap();
        assert!(matches!(image, MessageContent::Image(_)));

        let post: MessageContent =
            serde_json::from_value(serde_json::json!({"post_id": "99"})).unwrap();
        assert!(matches!(post, MessageContent::Post(_)));
    }
}
