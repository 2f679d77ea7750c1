//! Mattermost REST v4 and websocket payloads, and the API seam the bridge
//! drives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BridgeError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MmUser {
    pub id: String,
    pub username: String,
    pub nickname: String,
    pub first_name: String,
    pub last_name: String,
    pub delete_at: i64,
}

impl MmUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MmTeam {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MmChannel {
    pub id: String,
    pub team_id: String,
    /// URL name; `<id>__<id>` for direct channels.
    pub name: String,
    pub display_name: String,
    pub header: String,
    /// `O` open, `P` private, `D` direct, `G` group.
    #[serde(rename = "type")]
    pub kind: String,
}

impl MmChannel {
    pub fn is_direct(&self) -> bool {
        self.kind == "D"
    }

    /// The other participant of a direct channel.
    pub fn direct_partner(&self, me: &str) -> Option<String> {
        if !self.is_direct() {
            return None;
        }
        let (a, b) = self.name.split_once("__")?;
        Some(if a == me { b } else { a }.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MmChannelMember {
    pub channel_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MmFileInfo {
    pub id: String,
    pub name: String,
    pub extension: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MmPostMetadata {
    pub files: Vec<MmFileInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MmPost {
    pub id: String,
    pub create_at: i64,
    pub update_at: i64,
    pub delete_at: i64,
    pub user_id: String,
    pub channel_id: String,
    pub root_id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub props: Map<String, Value>,
    pub metadata: MmPostMetadata,
}

impl MmPost {
    fn prop(&self, key: &str) -> &str {
        self.props.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// New header of a `system_header_change` post.
    pub fn new_header(&self) -> &str {
        self.prop("new_header")
    }

    /// Name shown for webhook posts.
    pub fn override_username(&self) -> &str {
        self.prop("override_username")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MmReaction {
    pub user_id: String,
    pub post_id: String,
    pub emoji_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WsBroadcast {
    pub channel_id: String,
    pub user_id: String,
    pub team_id: String,
}

/// One websocket event frame. Replies to our own requests carry no `event`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WsEvent {
    pub event: String,
    pub data: Map<String, Value>,
    pub broadcast: WsBroadcast,
}

impl WsEvent {
    pub fn str(&self, key: &str) -> &str {
        self.data.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// Decode a field that the server sends as a JSON document in a string.
    pub fn embedded<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<T, BridgeError> {
        Ok(serde_json::from_str(self.str(key))?)
    }
}

/// First frame on the websocket.
#[derive(Debug, Serialize)]
pub struct AuthChallenge<'a> {
    pub seq: u64,
    pub action: &'static str,
    pub data: AuthToken<'a>,
}

#[derive(Debug, Serialize)]
pub struct AuthToken<'a> {
    pub token: &'a str,
}

impl<'a> AuthChallenge<'a> {
    pub fn new(token: &'a str) -> Self {
        Self {
            seq: 1,
            action: "authentication_challenge",
            data: AuthToken { token },
        }
    }
}

/// The Mattermost REST calls the bridge makes.
#[async_trait]
pub trait MattermostApi: Send + Sync {
    async fn me(&self) -> Result<MmUser, BridgeError>;
    async fn team_by_name(&self, name: &str) -> Result<MmTeam, BridgeError>;
    async fn user(&self, user_id: &str) -> Result<MmUser, BridgeError>;
    async fn team_users(&self, team_id: &str) -> Result<Vec<MmUser>, BridgeError>;
    /// Channels of the team the account is a member of.
    async fn my_channels(&self, team_id: &str) -> Result<Vec<MmChannel>, BridgeError>;
    /// Public channels of the team.
    async fn team_channels(&self, team_id: &str) -> Result<Vec<MmChannel>, BridgeError>;
    async fn channel(&self, channel_id: &str) -> Result<MmChannel, BridgeError>;
    async fn channel_by_name(&self, team_id: &str, name: &str) -> Result<MmChannel, BridgeError>;
    async fn channel_members(&self, channel_id: &str) -> Result<Vec<String>, BridgeError>;
    async fn add_member(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError>;
    async fn remove_member(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError>;
    async fn patch_header(&self, channel_id: &str, header: &str) -> Result<(), BridgeError>;
    async fn create_post(&self, channel_id: &str, message: &str) -> Result<MmPost, BridgeError>;
    async fn direct_channel(&self, user_a: &str, user_b: &str) -> Result<MmChannel, BridgeError>;
    /// `online` or `away`.
    async fn set_status(&self, user_id: &str, status: &str) -> Result<(), BridgeError>;
    /// A post by id; `None` if it does not exist.
    async fn post(&self, post_id: &str) -> Result<Option<MmPost>, BridgeError>;
    fn file_url(&self, file_id: &str) -> String;
    fn websocket_url(&self) -> String;
    fn token(&self) -> String;
}
