//! Slack Web API and RTM payloads, and the API seam the bridge drives.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::BridgeError;

/// `auth.test` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthTest {
    pub url: String,
    pub team: String,
    pub user: String,
    pub team_id: String,
    pub user_id: String,
}

impl AuthTest {
    /// Workspace domain, e.g. `example` for `https://example.slack.com/`.
    pub fn domain(&self) -> &str {
        self.url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split('.')
            .next()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackProfile {
    pub display_name: String,
    pub real_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackUser {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub real_name: String,
    pub deleted: bool,
    pub is_bot: bool,
    pub profile: SlackProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackBot {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackTopic {
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackChannel {
    pub id: String,
    pub name: String,
    pub is_private: bool,
    pub is_im: bool,
    pub is_mpim: bool,
    pub is_member: bool,
    pub topic: SlackTopic,
    /// Other party of an IM.
    pub user: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackAttachment {
    pub pretext: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackFile {
    pub mode: String,
    pub name: String,
    pub title: String,
    pub filetype: String,
    pub url_private: String,
}

/// A message, as found in history, RTM events and item references.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackMessage {
    pub subtype: String,
    pub channel: String,
    pub user: String,
    pub bot_id: String,
    pub username: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: String,
    pub deleted_ts: String,
    /// New topic of a `channel_topic` message.
    pub topic: String,
    pub attachments: Vec<SlackAttachment>,
    pub files: Vec<SlackFile>,
    /// The edited message of a `message_changed` event.
    pub message: Option<Box<SlackMessage>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReactionItem {
    pub channel: String,
    pub ts: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReactionEvent {
    pub user: String,
    pub reaction: String,
    pub item: ReactionItem,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StarPinItem {
    pub channel: String,
    pub message: Option<SlackMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemEvent {
    pub user: String,
    pub item: StarPinItem,
}

/// RTM event stream frames the bridge understands.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    Message(SlackMessage),
    MemberJoinedChannel {
        user: String,
        channel: String,
        #[serde(default)]
        inviter: String,
    },
    MemberLeftChannel {
        user: String,
        channel: String,
    },
    /// The logged-in account joined a channel elsewhere.
    ChannelJoined {
        channel: SlackChannel,
    },
    /// The logged-in account left a channel elsewhere.
    ChannelLeft {
        channel: String,
    },
    ReactionAdded(ReactionEvent),
    ReactionRemoved(ReactionEvent),
    StarAdded(ItemEvent),
    StarRemoved(ItemEvent),
    PinAdded(ItemEvent),
    PinRemoved(ItemEvent),
    Goodbye,
    /// The socket closed.
    #[serde(skip)]
    Disconnected,
    #[serde(other)]
    Unknown,
}

/// The Slack Web API calls the bridge makes.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn auth_test(&self) -> Result<AuthTest, BridgeError>;
    async fn users_list(&self) -> Result<Vec<SlackUser>, BridgeError>;
    async fn user_info(&self, user_id: &str) -> Result<SlackUser, BridgeError>;
    async fn bot_info(&self, bot_id: &str) -> Result<SlackBot, BridgeError>;
    /// Public and private channels visible to the account.
    async fn conversations_list(&self) -> Result<Vec<SlackChannel>, BridgeError>;
    async fn conversation_info(&self, channel_id: &str) -> Result<SlackChannel, BridgeError>;
    async fn conversation_members(&self, channel_id: &str) -> Result<Vec<String>, BridgeError>;
    async fn join(&self, channel_id: &str) -> Result<SlackChannel, BridgeError>;
    async fn leave(&self, channel_id: &str) -> Result<(), BridgeError>;
    async fn invite(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError>;
    async fn kick(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError>;
    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<(), BridgeError>;
    /// Open (or reuse) the IM with a user; returns its channel id.
    async fn open_dm(&self, user_id: &str) -> Result<String, BridgeError>;
    /// Returns the `ts` of the new message.
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<String, BridgeError>;
    /// `auto` or `away`.
    async fn set_presence(&self, presence: &str) -> Result<(), BridgeError>;
    /// The message with exactly this `ts`, if it exists.
    async fn message_at(
        &self,
        channel_id: &str,
        ts: &str,
    ) -> Result<Option<SlackMessage>, BridgeError>;
    /// Websocket URL for the RTM stream.
    async fn rtm_connect(&self) -> Result<String, BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_parsing() {
        let ev: SlackEvent = serde_json::from_str(
            r#"{"type":"message","channel":"C1","user":"U1","text":"hi","ts":"1.0"}"#,
        )
        .unwrap();
        assert!(matches!(ev, SlackEvent::Message(ref m) if m.text == "hi" && m.channel == "C1"));

        let ev: SlackEvent = serde_json::from_str(
            r#"{"type":"reaction_added","user":"U1","reaction":"tada","item":{"type":"message","channel":"C1","ts":"2.0"},"event_ts":"3.0"}"#,
        )
        .unwrap();
        assert!(matches!(ev, SlackEvent::ReactionAdded(ref r) if r.item.ts == "2.0"));

        let ev: SlackEvent =
            serde_json::from_str(r#"{"type":"user_typing","channel":"C1","user":"U1"}"#).unwrap();
        assert!(matches!(ev, SlackEvent::Unknown));

        let ev: SlackEvent = serde_json::from_str(r#"{"type":"goodbye"}"#).unwrap();
        assert!(matches!(ev, SlackEvent::Goodbye));
    }

    #[test]
    fn test_auth_domain() {
        let auth = AuthTest {
            url: "https://example.slack.com/".into(),
            ..Default::default()
        };
        assert_eq!(auth.domain(), "example");
    }
}
