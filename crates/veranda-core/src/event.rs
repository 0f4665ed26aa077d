//! Typed events decoded from webhook callbacks.
//!
//! The platform delivers callbacks as a JSON envelope:
//!
//! ```text
//! { "event": {
//!     "robot": { "villa_id": ..., "template": { "id": "bot_...", ... } },
//!     "type": 2,
//!     "extend_data": { "EventData": { "SendMessage": { ... } } },
//!     "id": "...", "created_at": ..., "send_at": ...
//! } }
//! ```
//!
//! [`decode_event`] turns that envelope into an [`Event`]: a shared
//! [`EventHeader`] plus one [`EventKind`] variant selected by the numeric
//! `type` discriminator. Unrecognized discriminators decode to
//! [`EventKind::Unknown`] carrying the raw payload, so new platform event
//! types never break dispatch.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::DecodeError;
use crate::message::{Message, MessageContentInfo};

// ============================================================================
// Event Type Classification
// ============================================================================

/// High-level event classification, mapped from the numeric discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A member joined the villa (`type = 1`).
    JoinVilla,
    /// A member @-mentioned the bot with a message (`type = 2`).
    SendMessage,
    /// The bot was added to a villa (`type = 3`).
    CreateRobot,
    /// The bot was removed from a villa (`type = 4`).
    DeleteRobot,
    /// A member reacted to a bot message with an emoticon (`type = 5`).
    AddQuickEmoticon,
    /// An audit finished (`type = 6`).
    AuditCallback,
    /// Any discriminator this build does not know.
    Other,
}

impl EventType {
    /// Maps the wire discriminator to a classification.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::JoinVilla,
            2 => Self::SendMessage,
            3 => Self::CreateRobot,
            4 => Self::DeleteRobot,
            5 => Self::AddQuickEmoticon,
            6 => Self::AuditCallback,
            _ => Self::Other,
        }
    }
}

/// Outcome of a content audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum AuditResult {
    /// Legacy callbacks without a verdict.
    Compatibility,
    /// Content passed.
    Pass,
    /// Content rejected.
    Reject,
}

impl From<AuditResult> for i64 {
    fn from(result: AuditResult) -> i64 {
        match result {
            AuditResult::Compatibility => 0,
            AuditResult::Pass => 1,
            AuditResult::Reject => 2,
        }
    }
}

impl TryFrom<i64> for AuditResult {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Compatibility),
            1 => Ok(Self::Pass),
            2 => Ok(Self::Reject),
            other => Err(format!("invalid audit result: {other}")),
        }
    }
}

// ============================================================================
// Event Header
// ============================================================================

/// A command pre-registered on the bot template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCommand {
    /// Command text (e.g. `/help`).
    pub name: String,
    /// Command description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

/// The bot template as configured in the developer console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Bot ID.
    pub id: String,
    /// Bot display name.
    #[serde(default)]
    pub name: String,
    /// Bot description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Bot avatar URL.
    #[serde(default)]
    pub icon: String,
    /// Pre-registered commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<TemplateCommand>>,
}

/// The bot instance the event was delivered to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    /// Villa the event originated in.
    pub villa_id: u64,
    /// The receiving bot's template.
    pub template: Template,
}

/// Fields shared by every callback event.
///
/// The header identifies the event's origin; it references the receiving
/// bot by ID only and never owns registry state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHeader {
    /// The receiving bot and its villa.
    pub robot: Robot,
    /// Platform-assigned event ID.
    #[serde(default)]
    pub id: String,
    /// When the platform created the event.
    #[serde(default)]
    pub created_at: i64,
    /// When the platform sent the callback.
    #[serde(default)]
    pub send_at: i64,
}

// ============================================================================
// Event Variants
// ============================================================================

/// A member joined the villa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinVillaEvent {
    /// Joining user's ID.
    pub join_uid: u64,
    /// Joining user's nickname.
    pub join_user_nickname: String,
    /// Join timestamp.
    pub join_at: i64,
}

/// A member @-mentioned the bot with a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageEvent {
    /// Wire content of the message.
    #[serde(deserialize_with = "content_from_wire")]
    pub content: MessageContentInfo,
    /// Sender's user ID.
    pub from_user_id: u64,
    /// Send timestamp.
    pub send_at: i64,
    /// Room the message was sent in.
    pub room_id: u64,
    /// Wire object kind (text only, as of the current platform).
    #[serde(default)]
    pub object_name: i64,
    /// Sender's nickname.
    #[serde(default)]
    pub nickname: String,
    /// Message ID.
    pub msg_uid: String,
    /// Set when the replied-to message belongs to the bot.
    #[serde(default)]
    pub bot_msg_id: Option<String>,
    /// Villa the message was sent in.
    pub villa_id: u64,
    /// Receiving bot's ID.
    pub bot_id: String,
    /// Segment view of the content, rebuilt after decoding. Not on the wire.
    #[serde(skip)]
    pub message: Message,
}

/// The bot was added to a villa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRobotEvent {
    /// The villa the bot was added to.
    pub villa_id: u64,
}

/// The bot was removed from a villa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRobotEvent {
    /// The villa the bot was removed from.
    pub villa_id: u64,
}

/// A member reacted to a bot message with a quick emoticon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddQuickEmoticonEvent {
    /// Villa the reaction happened in.
    pub villa_id: u64,
    /// Room the reaction happened in.
    pub room_id: u64,
    /// Reacting user's ID.
    pub uid: u64,
    /// Emoticon ID.
    pub emoticon_id: u64,
    /// Emoticon display text.
    pub emoticon: String,
    /// The message that was reacted to.
    pub msg_uid: String,
    /// Set when the reacted-to message belongs to the bot.
    #[serde(default)]
    pub bot_msg_id: Option<String>,
    /// Whether the reaction was removed rather than added.
    #[serde(default)]
    pub is_cancel: bool,
}

/// An audit submitted through the audit API finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCallbackEvent {
    /// Audit job ID.
    pub audit_id: String,
    /// Auditing bot's ID.
    pub bot_tpl_id: String,
    /// Villa the audit was submitted for.
    pub villa_id: u64,
    /// Room passed by the audit caller.
    #[serde(default)]
    pub room_id: u64,
    /// User passed by the audit caller.
    #[serde(default)]
    pub user_id: u64,
    /// Caller-supplied passthrough data.
    #[serde(default)]
    pub pass_through: String,
    /// The verdict.
    pub audit_result: AuditResult,
}

/// A well-formed callback whose discriminator this build does not know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownEvent {
    /// The unrecognized discriminator.
    pub event_type: i64,
    /// The full callback payload, kept for forward compatibility.
    pub payload: Value,
}

// ============================================================================
// Event
// ============================================================================

/// One decoded callback event: shared header plus typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Fields shared by all callbacks.
    pub header: EventHeader,
    /// The typed payload.
    pub kind: EventKind,
}

/// The typed payload of an [`Event`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A member joined the villa.
    JoinVilla(JoinVillaEvent),
    /// A member @-mentioned the bot.
    SendMessage(Box<SendMessageEvent>),
    /// The bot was added to a villa.
    CreateRobot(CreateRobotEvent),
    /// The bot was removed from a villa.
    DeleteRobot(DeleteRobotEvent),
    /// A member reacted with a quick emoticon.
    AddQuickEmoticon(AddQuickEmoticonEvent),
    /// An audit finished.
    AuditCallback(AuditCallbackEvent),
    /// Unrecognized event type.
    Unknown(UnknownEvent),
}

impl Event {
    /// The event's classification.
    pub fn event_type(&self) -> EventType {
        match &self.kind {
            EventKind::JoinVilla(_) => EventType::JoinVilla,
            EventKind::SendMessage(_) => EventType::SendMessage,
            EventKind::CreateRobot(_) => EventType::CreateRobot,
            EventKind::DeleteRobot(_) => EventType::DeleteRobot,
            EventKind::AddQuickEmoticon(_) => EventType::AddQuickEmoticon,
            EventKind::AuditCallback(_) => EventType::AuditCallback,
            EventKind::Unknown(_) => EventType::Other,
        }
    }

    /// Human-readable name of the event kind.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            EventKind::JoinVilla(_) => "JoinVilla",
            EventKind::SendMessage(_) => "SendMessage",
            EventKind::CreateRobot(_) => "CreateRobot",
            EventKind::DeleteRobot(_) => "DeleteRobot",
            EventKind::AddQuickEmoticon(_) => "AddQuickEmoticon",
            EventKind::AuditCallback(_) => "AuditCallback",
            EventKind::Unknown(_) => "Unknown",
        }
    }

    /// ID of the bot this event was delivered to.
    pub fn bot_id(&self) -> &str {
        &self.header.robot.template.id
    }

    /// Villa the event originated in.
    pub fn villa_id(&self) -> u64 {
        self.header.robot.villa_id
    }

    /// Room the event relates to, for room-scoped events.
    pub fn room_id(&self) -> Option<u64> {
        match &self.kind {
            EventKind::SendMessage(e) => Some(e.room_id),
            EventKind::AddQuickEmoticon(e) => Some(e.room_id),
            _ => None,
        }
    }

    /// The (villa, room) a reply to this event should go to.
    pub fn reply_target(&self) -> Option<(u64, u64)> {
        match &self.kind {
            EventKind::SendMessage(e) => Some((e.villa_id, e.room_id)),
            EventKind::AddQuickEmoticon(e) => Some((e.villa_id, e.room_id)),
            _ => None,
        }
    }

    /// The message carried by the event, for message events.
    pub fn message(&self) -> Option<&Message> {
        match &self.kind {
            EventKind::SendMessage(e) => Some(&e.message),
            _ => None,
        }
    }

    /// Plain text of the carried message, or empty for non-message events.
    pub fn plain_text(&self) -> String {
        self.message().map(Message::plain_text).unwrap_or_default()
    }
}

// ============================================================================
// Typed extraction
// ============================================================================

/// Extracts a concrete event payload from a decoded [`Event`].
///
/// Implemented by every variant payload, so handlers can request exactly
/// the event they care about (see `EventCtx` in the extractor module).
pub trait FromEvent: Sized {
    /// Returns the payload when the event is of the matching kind.
    fn from_event(event: &Event) -> Option<Self>;
}

impl FromEvent for Event {
    fn from_event(event: &Event) -> Option<Self> {
        Some(event.clone())
    }
}

macro_rules! impl_from_event {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl FromEvent for $ty {
                fn from_event(event: &Event) -> Option<Self> {
                    match &event.kind {
                        EventKind::$variant(e) => Some(e.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_from_event! {
    JoinVilla => JoinVillaEvent,
    CreateRobot => CreateRobotEvent,
    DeleteRobot => DeleteRobotEvent,
    AddQuickEmoticon => AddQuickEmoticonEvent,
    AuditCallback => AuditCallbackEvent,
    Unknown => UnknownEvent,
}

impl FromEvent for SendMessageEvent {
    fn from_event(event: &Event) -> Option<Self> {
        match &event.kind {
            EventKind::SendMessage(e) => Some((**e).clone()),
            _ => None,
        }
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Accepts message content delivered either inline or as a JSON-encoded
/// string, which is how the platform actually ships it.
fn content_from_wire<'de, D>(deserializer: D) -> Result<MessageContentInfo, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(inner) => serde_json::from_str(&inner).map_err(serde::de::Error::custom),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

fn extract<T: DeserializeOwned>(name: &str, data: &Value) -> Result<T, DecodeError> {
    let inner = data
        .get(name)
        .ok_or_else(|| DecodeError::malformed(format!("missing event data `{name}`")))?;
    serde_json::from_value(inner.clone())
        .map_err(|e| DecodeError::malformed(format!("invalid `{name}` data: {e}")))
}

/// Decodes a raw webhook body into a typed event.
///
/// Pure: no I/O, no shared state. Fails only when the body cannot be
/// parsed as a callback envelope; unrecognized event types decode to
/// [`EventKind::Unknown`].
pub fn decode_event(body: &[u8]) -> Result<Event, DecodeError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| DecodeError::malformed(e.to_string()))?;
    let payload = value
        .get("event")
        .ok_or_else(|| DecodeError::malformed("missing `event` wrapper"))?;
    decode_callback(payload)
}

/// Decodes the inner callback object (the value of the `event` key).
pub fn decode_callback(payload: &Value) -> Result<Event, DecodeError> {
    let header: EventHeader = serde_json::from_value(payload.clone())
        .map_err(|e| DecodeError::malformed(format!("invalid event header: {e}")))?;
    let code = payload
        .get("type")
        .and_then(Value::as_i64)
        .ok_or_else(|| DecodeError::malformed("missing `type` discriminator"))?;
    let data = payload
        .pointer("/extend_data/EventData")
        .cloned()
        .unwrap_or(Value::Null);

    let kind = match EventType::from_code(code) {
        EventType::JoinVilla => EventKind::JoinVilla(extract("JoinVilla", &data)?),
        EventType::SendMessage => {
            let mut event: SendMessageEvent = extract("SendMessage", &data)?;
            event.message = event.content.to_message(Some(event.villa_id));
            EventKind::SendMessage(Box::new(event))
        }
        EventType::CreateRobot => EventKind::CreateRobot(extract("CreateRobot", &data)?),
        EventType::DeleteRobot => EventKind::DeleteRobot(extract("DeleteRobot", &data)?),
        EventType::AddQuickEmoticon => {
            EventKind::AddQuickEmoticon(extract("AddQuickEmoticon", &data)?)
        }
        EventType::AuditCallback => EventKind::AuditCallback(extract("AuditCallback", &data)?),
        EventType::Other => EventKind::Unknown(UnknownEvent {
            event_type: code,
            payload: payload.clone(),
        }),
    };

    Ok(Event { header, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn callback(code: i64, name: &str, data: Value) -> Vec<u8> {
        json!({
            "event": {
                "robot": {
                    "villa_id": 100,
                    "template": { "id": "bot_1", "name": "Pallas", "icon": "" }
                },
                "type": code,
                "extend_data": { "EventData": { name: data } },
                "id": "event-1",
                "created_at": 1_690_000_000,
                "send_at": 1_690_000_001
            }
        })
        .to_string()
        .into_bytes()
    }

    fn send_message_data() -> Value {
        json!({
            "content": {
                "content": { "text": "@Pallas hello", "entities": [
                    { "offset": 0, "length": 8,
                      "entity": { "type": "mentioned_robot", "bot_id": "bot_1" } }
                ]}
            },
            "from_user_id": 42,
            "send_at": 1_690_000_001,
            "room_id": 7,
            "object_name": 1,
            "nickname": "Traveler",
            "msg_uid": "msg-1",
            "bot_msg_id": "",
            "villa_id": 100,
            "bot_id": "bot_1"
        })
    }

    #[test]
    fn decodes_send_message() {
        let body = callback(2, "SendMessage", send_message_data());
        let event = decode_event(&body).unwrap();

        assert_eq!(event.event_type(), EventType::SendMessage);
        assert_eq!(event.name(), "SendMessage");
        assert_eq!(event.bot_id(), "bot_1");
        assert_eq!(event.villa_id(), 100);
        assert_eq!(event.room_id(), Some(7));
        assert_eq!(event.reply_target(), Some((100, 7)));
        assert_eq!(event.plain_text(), "hello");

        let EventKind::SendMessage(e) = &event.kind else {
            panic!("wrong kind");
        };
        assert_eq!(e.from_user_id, 42);
        assert_eq!(e.msg_uid, "msg-1");
    }

    #[test]
    fn decodes_string_encoded_content() {
        let mut data = send_message_data();
        let inline = data["content"].take();
        data["content"] = Value::String(inline.to_string());

        let body = callback(2, "SendMessage", data);
        let event = decode_event(&body).unwrap();
        assert_eq!(event.plain_text(), "hello");
    }

    #[test]
    fn decodes_join_villa() {
        let body = callback(
            1,
            "JoinVilla",
            json!({ "join_uid": 9, "join_user_nickname": "Newcomer", "join_at": 123 }),
        );
        let event = decode_event(&body).unwrap();
        let JoinVillaEvent {
            join_uid,
            join_user_nickname,
            join_at,
        } = JoinVillaEvent::from_event(&event).unwrap();
        assert_eq!(join_uid, 9);
        assert_eq!(join_user_nickname, "Newcomer");
        assert_eq!(join_at, 123);
        assert!(event.reply_target().is_none());
    }

    #[test]
    fn unknown_type_decodes_to_unknown() {
        let body = callback(99, "SomethingNew", json!({ "field": true }));
        let event = decode_event(&body).unwrap();
        assert_eq!(event.event_type(), EventType::Other);
        assert_eq!(event.name(), "Unknown");
        assert_eq!(event.bot_id(), "bot_1");

        let unknown = UnknownEvent::from_event(&event).unwrap();
        assert_eq!(unknown.event_type, 99);
        assert_eq!(
            unknown.payload["extend_data"]["EventData"]["SomethingNew"]["field"],
            true
        );
    }

    #[test]
    fn garbage_body_is_malformed() {
        assert!(matches!(
            decode_event(b"not json at all"),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn missing_event_wrapper_is_malformed() {
        assert!(matches!(
            decode_event(br#"{"something": "else"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn known_type_with_broken_data_is_malformed() {
        let body = callback(1, "JoinVilla", json!({ "join_uid": "not a number" }));
        assert!(matches!(decode_event(&body), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn round_trip_recovers_fields() {
        let original = AddQuickEmoticonEvent {
            villa_id: 100,
            room_id: 7,
            uid: 42,
            emoticon_id: 5,
            emoticon: "爆炒".to_string(),
            msg_uid: "msg-1".to_string(),
            bot_msg_id: Some("bot-msg-1".to_string()),
            is_cancel: false,
        };
        let body = callback(
            5,
            "AddQuickEmoticon",
            serde_json::to_value(&original).unwrap(),
        );
        let event = decode_event(&body).unwrap();
        assert_eq!(
            AddQuickEmoticonEvent::from_event(&event).unwrap(),
            original
        );

        let original = AuditCallbackEvent {
            audit_id: "audit-1".to_string(),
            bot_tpl_id: "bot_1".to_string(),
            villa_id: 100,
            room_id: 7,
            user_id: 42,
            pass_through: "ctx".to_string(),
            audit_result: AuditResult::Pass,
        };
        let body = callback(6, "AuditCallback", serde_json::to_value(&original).unwrap());
        let event = decode_event(&body).unwrap();
        assert_eq!(AuditCallbackEvent::from_event(&event).unwrap(), original);

        let original = CreateRobotEvent { villa_id: 100 };
        let body = callback(3, "CreateRobot", serde_json::to_value(&original).unwrap());
        let event = decode_event(&body).unwrap();
        assert_eq!(CreateRobotEvent::from_event(&event).unwrap(), original);

        let original = DeleteRobotEvent { villa_id: 100 };
        let body = callback(4, "DeleteRobot", serde_json::to_value(&original).unwrap());
        let event = decode_event(&body).unwrap();
        assert_eq!(DeleteRobotEvent::from_event(&event).unwrap(), original);
    }

    #[test]
    fn from_event_rejects_other_kinds() {
        let body = callback(3, "CreateRobot", json!({ "villa_id": 100 }));
        let event = decode_event(&body).unwrap();
        assert!(SendMessageEvent::from_event(&event).is_none());
        assert!(JoinVillaEvent::from_event(&event).is_none());
    }
}
