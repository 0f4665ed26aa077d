//! Typed models for platform API responses.
//!
//! Field names follow the wire format of the bot platform API; enums carry
//! the platform's string constants.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Response envelope
// ============================================================================

/// The envelope every API response arrives in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Zero on success.
    pub retcode: i64,
    /// Human-readable status.
    #[serde(default)]
    pub message: String,
    /// Endpoint-specific payload.
    #[serde(default)]
    pub data: Option<Value>,
}

// ============================================================================
// Villa
// ============================================================================

/// A villa (community).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Villa {
    /// Villa ID.
    pub villa_id: u64,
    /// Villa name.
    pub name: String,
    /// Avatar URL.
    #[serde(default)]
    pub villa_avatar_url: String,
    /// Owner's user ID. The wire field name is misspelled by the platform.
    #[serde(rename = "onwer_uid")]
    pub owner_uid: u64,
    /// Whether the villa is official.
    #[serde(default)]
    pub is_official: bool,
    /// Introduction text.
    #[serde(default)]
    pub introduce: String,
    /// Category ID.
    #[serde(default)]
    pub category_id: u64,
    /// Villa tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

// ============================================================================
// Members
// ============================================================================

/// Basic profile of a villa member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberBasic {
    /// User ID.
    pub uid: u64,
    /// Nickname.
    pub nickname: String,
    /// Introduction text.
    #[serde(default)]
    pub introduce: String,
    /// Avatar ID.
    #[serde(default)]
    pub avatar: u64,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: String,
}

/// A villa member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Basic profile.
    pub basic: MemberBasic,
    /// IDs of the member's roles.
    #[serde(default)]
    pub role_id_list: Vec<u64>,
    /// Join timestamp.
    #[serde(default)]
    pub joined_at: i64,
    /// The member's roles.
    #[serde(default)]
    pub role_list: Vec<MemberRole>,
}

/// One page of the villa member list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberListReturn {
    /// Members on this page.
    #[serde(default)]
    pub list: Vec<Member>,
    /// Offset to pass for the next page.
    #[serde(default)]
    pub next_offset: i64,
}

/// Access info returned when checking a member bot access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotMemberAccessInfo {
    /// User ID the token belongs to.
    pub uid: u64,
    /// Villa the token was issued in.
    pub villa_id: u64,
    /// The validated token.
    pub member_access_token: String,
    /// Bot template ID.
    pub bot_tpl_id: String,
}

/// Result of validating a member bot access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckMemberBotAccessTokenReturn {
    /// Token details.
    pub access_info: BotMemberAccessInfo,
    /// The member the token belongs to.
    pub member: Member,
}

// ============================================================================
// Rooms
// ============================================================================

/// Room kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    /// Chat room.
    #[serde(rename = "BOT_PLATFORM_ROOM_TYPE_CHAT_ROOM")]
    Chat,
    /// Post room.
    #[serde(rename = "BOT_PLATFORM_ROOM_TYPE_POST_ROOM")]
    Post,
    /// Scene room.
    #[serde(rename = "BOT_PLATFORM_ROOM_TYPE_SCENE_ROOM")]
    Scene,
    /// Live room.
    #[serde(rename = "BOT_PLATFORM_ROOM_TYPE_LIVE_ROOM")]
    Live,
    /// Invalid/unknown.
    #[serde(rename = "BOT_PLATFORM_ROOM_TYPE_INVALID")]
    Invalid,
}

/// Default notification setting of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomDefaultNotifyType {
    /// Notify members.
    #[serde(rename = "BOT_PLATFORM_DEFAULT_NOTIFY_TYPE_NOTIFY")]
    Notify,
    /// Stay silent.
    #[serde(rename = "BOT_PLATFORM_DEFAULT_NOTIFY_TYPE_IGNORE")]
    Ignore,
    /// Invalid/unknown.
    #[serde(rename = "BOT_PLATFORM_DEFAULT_NOTIFY_TYPE_INVALID")]
    Invalid,
}

/// Who may send messages in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMsgAuthRange {
    /// Whether every member may send.
    #[serde(default)]
    pub is_all_send_msg: bool,
    /// Roles allowed to send when restricted.
    #[serde(default)]
    pub roles: Vec<u64>,
}

/// A room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Room ID.
    pub room_id: u64,
    /// Room name.
    pub room_name: String,
    /// Room kind.
    pub room_type: RoomType,
    /// Owning group.
    #[serde(default)]
    pub group_id: u64,
    /// Default notification setting.
    #[serde(default)]
    pub room_default_notify_type: Option<RoomDefaultNotifyType>,
    /// Send permissions.
    #[serde(default)]
    pub send_msg_auth_range: Option<SendMsgAuthRange>,
}

/// A room group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Group ID.
    pub group_id: u64,
    /// Group name.
    pub group_name: String,
}

/// A group together with its rooms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRoom {
    /// Group ID.
    pub group_id: u64,
    /// Group name.
    pub group_name: String,
    /// Rooms in the group.
    #[serde(default)]
    pub room_list: Vec<Room>,
}

/// One entry of a room ordering request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSort {
    /// Room to place.
    pub room_id: u64,
    /// Group to place it in.
    pub group_id: u64,
}

// ============================================================================
// Roles
// ============================================================================

/// Role kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleType {
    /// The built-in everyone role.
    #[serde(rename = "MEMBER_ROLE_TYPE_ALL_MEMBER")]
    AllMember,
    /// The built-in admin role.
    #[serde(rename = "MEMBER_ROLE_TYPE_ADMIN")]
    Admin,
    /// The built-in owner role.
    #[serde(rename = "MEMBER_ROLE_TYPE_OWNER")]
    Owner,
    /// A custom role.
    #[serde(rename = "MEMBER_ROLE_TYPE_CUSTOM")]
    Custom,
    /// Unknown.
    #[serde(rename = "MEMBER_ROLE_TYPE_UNKNOWN")]
    Unknown,
}

/// Role permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// @-mention everyone.
    MentionAll,
    /// Recall messages.
    RecallMessage,
    /// Pin messages.
    PinMessage,
    /// Manage roles.
    ManageMemberRole,
    /// Edit villa info.
    EditVillaInfo,
    /// Manage groups and rooms.
    ManageGroupAndRoom,
    /// Mute the villa.
    VillaSilence,
    /// Ban members.
    BlackOut,
    /// Handle join requests.
    HandleApply,
    /// Manage chat rooms.
    ManageChatRoom,
    /// View the data board.
    ViewDataBoard,
    /// Manage custom events.
    ManageCustomEvent,
    /// Order in live rooms.
    LiveRoomOrder,
    /// Manage spotlight collections.
    ManageSpotlightCollection,
}

/// Role display colors accepted by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    /// Grey.
    #[serde(rename = "#6173AB")]
    Grey,
    /// Pink.
    #[serde(rename = "#F485D8")]
    Pink,
    /// Red.
    #[serde(rename = "#F47884")]
    Red,
    /// Orange.
    #[serde(rename = "#FFA54B")]
    Orange,
    /// Green.
    #[serde(rename = "#7ED321")]
    Green,
    /// Blue.
    #[serde(rename = "#59A1EA")]
    Blue,
    /// Purple.
    #[serde(rename = "#977EE1")]
    Purple,
}

/// A member role as attached to member records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRole {
    /// Role ID.
    pub id: u64,
    /// Role name.
    pub name: String,
    /// Villa the role belongs to.
    pub villa_id: u64,
    /// Display color.
    #[serde(default)]
    pub color: String,
    /// Web display color.
    #[serde(default)]
    pub web_color: String,
    /// Permissions, when expanded.
    #[serde(default)]
    pub permissions: Option<Vec<Permission>>,
    /// Role kind.
    pub role_type: RoleType,
}

/// A permission with its display texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDetail {
    /// Permission key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub describe: String,
}

/// Full details of a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRoleDetail {
    /// Role ID.
    pub id: u64,
    /// Role name.
    pub name: String,
    /// Display color.
    #[serde(default)]
    pub color: String,
    /// Villa the role belongs to.
    pub villa_id: u64,
    /// Role kind.
    pub role_type: RoleType,
    /// Number of members holding the role.
    #[serde(default)]
    pub member_num: u64,
    /// Permissions, when expanded.
    #[serde(default)]
    pub permissions: Option<Vec<PermissionDetail>>,
}

// ============================================================================
// Emoticons
// ============================================================================

/// A platform emoticon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emoticon {
    /// Emoticon ID.
    pub emoticon_id: u64,
    /// Display text.
    #[serde(default)]
    pub describe_text: String,
    /// Icon URL.
    #[serde(default)]
    pub icon: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn villa_maps_the_misspelled_owner_field() {
        let villa: Villa = serde_json::from_value(json!({
            "villa_id": 100,
            "name": "Test Villa",
            "villa_avatar_url": "",
            "onwer_uid": 42,
            "is_official": false,
            "introduce": "",
            "category_id": 0,
            "tags": []
        }))
        .unwrap();
        assert_eq!(villa.owner_uid, 42);
    }

    #[test]
    fn room_type_uses_platform_constants() {
        let room: Room = serde_json::from_value(json!({
            "room_id": 7,
            "room_name": "general",
            "room_type": "BOT_PLATFORM_ROOM_TYPE_CHAT_ROOM",
            "group_id": 1
        }))
        .unwrap();
        assert_eq!(room.room_type, RoomType::Chat);
    }

    #[test]
    fn color_serializes_as_hex() {
        assert_eq!(serde_json::to_value(Color::Blue).unwrap(), "#59A1EA");
    }

    #[test]
    fn permission_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(Permission::MentionAll).unwrap(),
            "mention_all"
        );
    }

    #[test]
    fn api_response_tolerates_missing_data() {
        let resp: ApiResponse =
            serde_json::from_value(json!({ "retcode": 0, "message": "ok" })).unwrap();
        assert_eq!(resp.retcode, 0);
        assert!(resp.data.is_none());
    }
}
