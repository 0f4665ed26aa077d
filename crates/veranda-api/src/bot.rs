//! The concrete bot handle: one registered identity plus the API client.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};

use veranda_core::{
    ApiError, ApiResult, Bot, BotIdentity, Event, Message, MessageContentInfo, MessageSegment,
    encrypt_secret,
};

use crate::client::ApiClient;
use crate::models::{
    CheckMemberBotAccessTokenReturn, Color, Emoticon, Group, GroupRoom, Member, MemberListReturn,
    MemberRoleDetail, Permission, Room, RoomSort, Villa,
};

/// A bot's view of the platform API.
///
/// Carries the bot's identity and encrypted secret; all requests go
/// through the process-wide [`ApiClient`] pool. Shared as `Arc<VillaBot>`
/// between every handler of the bot.
pub struct VillaBot {
    identity: Arc<BotIdentity>,
    secret_encrypted: String,
    client: ApiClient,
}

macro_rules! villa_api {
    // No return payload.
    ($(#[$meta:meta])* $name:ident => $method:ident $endpoint:literal, ($($arg:ident: $typ:ty),* $(,)?)) => {
        $(#[$meta])*
        pub async fn $name(&self, villa_id: u64, $($arg: $typ),*) -> ApiResult<()> {
            self.request(
                Method::$method,
                $endpoint,
                Some(villa_id),
                json!({ $(stringify!($arg): $arg),* }),
            )
            .await?;
            Ok(())
        }
    };
    // Whole data object.
    ($(#[$meta:meta])* $name:ident => $method:ident $endpoint:literal, ($($arg:ident: $typ:ty),* $(,)?) -> $ret:ty) => {
        $(#[$meta])*
        pub async fn $name(&self, villa_id: u64, $($arg: $typ),*) -> ApiResult<$ret> {
            let data = self
                .request(
                    Method::$method,
                    $endpoint,
                    Some(villa_id),
                    json!({ $(stringify!($arg): $arg),* }),
                )
                .await?;
            Ok(serde_json::from_value(data)?)
        }
    };
    // One field of the data object.
    ($(#[$meta:meta])* $name:ident => $method:ident $endpoint:literal, ($($arg:ident: $typ:ty),* $(,)?) -> $ret:ty, $field:literal) => {
        $(#[$meta])*
        pub async fn $name(&self, villa_id: u64, $($arg: $typ),*) -> ApiResult<$ret> {
            let data = self
                .request(
                    Method::$method,
                    $endpoint,
                    Some(villa_id),
                    json!({ $(stringify!($arg): $arg),* }),
                )
                .await?;
            let value = data
                .get($field)
                .cloned()
                .ok_or_else(|| ApiError::Serialization(format!("missing field `{}`", $field)))?;
            Ok(serde_json::from_value(value)?)
        }
    };
}

impl VillaBot {
    /// Creates the bot handle, pre-computing the encrypted secret.
    pub fn new(identity: Arc<BotIdentity>, client: ApiClient) -> Self {
        let secret_encrypted = encrypt_secret(&identity.pub_key, &identity.secret);
        Self {
            identity,
            secret_encrypted,
            client,
        }
    }

    /// The bot's identity.
    pub fn identity(&self) -> &Arc<BotIdentity> {
        &self.identity
    }

    async fn request(
        &self,
        method: Method,
        api: &str,
        villa_id: Option<u64>,
        body: Value,
    ) -> ApiResult<Value> {
        self.client
            .call(
                method,
                api,
                &self.identity.bot_id,
                &self.secret_encrypted,
                villa_id,
                body,
            )
            .await
    }

    /// Sends a message into a room, resolving display names first.
    ///
    /// Convenience over the raw [`Bot::send_message`]: mention and
    /// room-link segments without display names are resolved through the
    /// member/room APIs, then the content is laid out and sent.
    pub async fn send_to(
        &self,
        villa_id: u64,
        room_id: u64,
        message: impl Into<Message> + Send,
    ) -> ApiResult<String> {
        let mut message = message.into();
        self.resolve_names(villa_id, &mut message).await?;
        let info = message.to_content_info()?;
        self.send_message(villa_id, room_id, info.content.object_name(), &info)
            .await
    }

    /// Fills in display names the message builder left unresolved.
    async fn resolve_names(&self, villa_id: u64, message: &mut Message) -> ApiResult<()> {
        // Collect lookups first: segments_mut borrows the message across
        // awaits otherwise.
        let mut user_lookups: Vec<(usize, u64, u64)> = Vec::new();
        let mut room_lookups: Vec<(usize, u64, u64)> = Vec::new();
        for (index, segment) in message.segments().iter().enumerate() {
            match segment {
                MessageSegment::MentionUser(m) if m.user_name.is_none() => {
                    user_lookups.push((index, m.villa_id.unwrap_or(villa_id), m.user_id));
                }
                MessageSegment::RoomLink(r) if r.room_name.is_none() => {
                    room_lookups.push((index, r.villa_id, r.room_id));
                }
                _ => {}
            }
        }

        for (index, villa, uid) in user_lookups {
            let member = self.get_member(villa, uid).await?;
            if let Some(MessageSegment::MentionUser(m)) = message.segments_mut().get_mut(index) {
                m.user_name = Some(member.basic.nickname);
            }
        }
        for (index, villa, room) in room_lookups {
            let room_info = self.get_room(villa, room).await?;
            if let Some(MessageSegment::RoomLink(r)) = message.segments_mut().get_mut(index) {
                r.room_name = Some(room_info.room_name);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Validates a member bot access token and returns the member.
    pub async fn check_member_bot_access_token(
        &self,
        token: &str,
        villa_id: Option<u64>,
    ) -> ApiResult<CheckMemberBotAccessTokenReturn> {
        let data = self
            .request(
                Method::GET,
                "checkMemberBotAccessToken",
                villa_id,
                json!({ "token": token }),
            )
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    // =========================================================================
    // Villa / members
    // =========================================================================

    villa_api!(
        /// Fetches villa details.
        get_villa => GET "getVilla", () -> Villa, "villa"
    );

    villa_api!(
        /// Fetches one member's details.
        get_member => GET "getMember", (uid: u64) -> Member, "member"
    );

    villa_api!(
        /// Fetches one page of the villa member list.
        get_villa_members => GET "getVillaMembers", (offset: i64, size: i64) -> MemberListReturn
    );

    villa_api!(
        /// Kicks a member from the villa.
        delete_villa_member => POST "deleteVillaMember", (uid: u64)
    );

    // =========================================================================
    // Messages
    // =========================================================================

    villa_api!(
        /// Pins or unpins a message.
        pin_message => POST "pinMessage", (msg_uid: &str, is_cancel: bool, room_id: u64, send_at: i64)
    );

    villa_api!(
        /// Recalls a message.
        recall_message => POST "recallMessage", (msg_uid: &str, msg_time: i64, room_id: u64)
    );

    // =========================================================================
    // Groups / rooms
    // =========================================================================

    villa_api!(
        /// Creates a room group.
        create_group => POST "createGroup", (group_name: &str) -> u64, "group_id"
    );

    villa_api!(
        /// Renames a room group.
        edit_group => POST "editGroup", (group_id: u64, group_name: &str)
    );

    villa_api!(
        /// Deletes a room group.
        delete_group => POST "deleteGroup", (group_id: u64)
    );

    villa_api!(
        /// Lists room groups.
        get_group_list => GET "getGroupList", () -> Vec<Group>, "list"
    );

    /// Reorders room groups.
    pub async fn sort_group_list(&self, villa_id: u64, group_ids: Vec<u64>) -> ApiResult<()> {
        self.request(
            Method::POST,
            "sortGroupList",
            Some(villa_id),
            json!({ "villa_id": villa_id, "group_ids": group_ids }),
        )
        .await?;
        Ok(())
    }

    villa_api!(
        /// Renames a room.
        edit_room => POST "editRoom", (room_id: u64, room_name: &str)
    );

    villa_api!(
        /// Deletes a room.
        delete_room => POST "deleteRoom", (room_id: u64)
    );

    villa_api!(
        /// Fetches room details.
        get_room => GET "getRoom", (room_id: u64) -> Room, "room"
    );

    villa_api!(
        /// Lists all groups with their rooms.
        get_villa_group_room_list => GET "getVillaGroupRoomList", () -> Vec<GroupRoom>, "list"
    );

    /// Reorders rooms across groups.
    pub async fn sort_room_list(&self, villa_id: u64, room_list: Vec<RoomSort>) -> ApiResult<()> {
        self.request(
            Method::POST,
            "sortRoomList",
            Some(villa_id),
            json!({ "villa_id": villa_id, "room_list": room_list }),
        )
        .await?;
        Ok(())
    }

    // =========================================================================
    // Roles
    // =========================================================================

    villa_api!(
        /// Adds a member to, or removes a member from, a role.
        operate_member_to_role => POST "operateMemberToRole", (role_id: u64, uid: u64, is_add: bool)
    );

    villa_api!(
        /// Creates a role.
        create_member_role => POST "createMemberRole", (name: &str, color: Color, permissions: Vec<Permission>) -> u64, "id"
    );

    /// Edits a role.
    pub async fn edit_member_role(
        &self,
        villa_id: u64,
        role_id: u64,
        name: &str,
        color: Color,
        permissions: Vec<Permission>,
    ) -> ApiResult<()> {
        self.request(
            Method::POST,
            "editMemberRole",
            Some(villa_id),
            json!({ "id": role_id, "name": name, "color": color, "permissions": permissions }),
        )
        .await?;
        Ok(())
    }

    /// Deletes a role.
    pub async fn delete_member_role(&self, villa_id: u64, role_id: u64) -> ApiResult<()> {
        self.request(
            Method::POST,
            "deleteMemberRole",
            Some(villa_id),
            json!({ "id": role_id }),
        )
        .await?;
        Ok(())
    }

    villa_api!(
        /// Fetches role details.
        get_member_role_info => GET "getMemberRoleInfo", (role_id: u64) -> MemberRoleDetail, "role"
    );

    villa_api!(
        /// Lists all roles in the villa.
        get_villa_member_roles => GET "getVillaMemberRoles", () -> Vec<MemberRoleDetail>, "list"
    );

    // =========================================================================
    // Emoticons / audit / images
    // =========================================================================

    /// Lists every platform emoticon.
    pub async fn get_all_emoticons(&self) -> ApiResult<Vec<Emoticon>> {
        let data = self
            .request(Method::GET, "getAllEmoticons", None, json!({}))
            .await?;
        let value = data
            .get("list")
            .cloned()
            .ok_or_else(|| ApiError::Serialization("missing field `list`".to_string()))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Submits content for audit. The verdict arrives later as an
    /// `AuditCallback` event carrying this audit ID.
    pub async fn audit(
        &self,
        villa_id: u64,
        audit_content: &str,
        pass_through: Option<&str>,
        room_id: Option<u64>,
        uid: Option<u64>,
    ) -> ApiResult<String> {
        let data = self
            .request(
                Method::POST,
                "audit",
                Some(villa_id),
                json!({
                    "audit_content": audit_content,
                    "pass_through": pass_through,
                    "room_id": room_id,
                    "uid": uid,
                }),
            )
            .await?;
        // The audit ID has shipped both as a string and as a number.
        match data.get("audit_id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(ApiError::Serialization(
                "missing field `audit_id`".to_string(),
            )),
        }
    }

    villa_api!(
        /// Re-hosts a third-party image on the platform image service.
        transfer_image => POST "transferImage", (url: &str) -> String, "new_url"
    );
}

#[async_trait]
impl Bot for VillaBot {
    fn id(&self) -> &str {
        &self.identity.bot_id
    }

    async fn send_message(
        &self,
        villa_id: u64,
        room_id: u64,
        object_name: &str,
        msg_content: &MessageContentInfo,
    ) -> ApiResult<String> {
        // The platform expects the content envelope JSON-encoded as a
        // string inside the request body.
        let content = serde_json::to_string(msg_content)?;
        let data = self
            .request(
                Method::POST,
                "sendMessage",
                Some(villa_id),
                json!({
                    "room_id": room_id,
                    "object_name": object_name,
                    "msg_content": content,
                }),
            )
            .await?;
        data.get("bot_msg_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Serialization("missing field `bot_msg_id`".to_string()))
    }

    async fn send(&self, event: &Event, message: Message) -> ApiResult<String> {
        let (villa_id, room_id) = event.reply_target().ok_or(ApiError::MissingSession)?;
        self.send_to(villa_id, room_id, message).await
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl std::fmt::Debug for VillaBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VillaBot")
            .field("bot_id", &self.identity.bot_id)
            .finish_non_exhaustive()
    }
}
