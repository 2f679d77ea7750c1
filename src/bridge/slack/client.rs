//! Slack Web API over HTTPS.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::trace;

use super::api::{AuthTest, SlackApi, SlackBot, SlackChannel, SlackMessage, SlackUser};
use crate::error::BridgeError;

const SLACK_API: &str = "https://slack.com/api";
const PAGE_LIMIT: &str = "200";

pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponseMetadata {
    next_cursor: String,
}

#[derive(Deserialize)]
struct UsersList {
    #[serde(default)]
    members: Vec<SlackUser>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Deserialize)]
struct ChannelsList {
    #[serde(default)]
    channels: Vec<SlackChannel>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Deserialize)]
struct MembersList {
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Deserialize)]
struct UserReply {
    user: SlackUser,
}

#[derive(Deserialize)]
struct BotReply {
    bot: SlackBot,
}

#[derive(Deserialize)]
struct ChannelReply {
    channel: SlackChannel,
}

#[derive(Deserialize)]
struct PostReply {
    ts: String,
}

#[derive(Deserialize)]
struct HistoryReply {
    #[serde(default)]
    messages: Vec<SlackMessage>,
}

#[derive(Deserialize)]
struct RtmReply {
    url: String,
}

impl SlackClient {
    pub fn new(token: String) -> Result<Self, BridgeError> {
        Self::with_base_url(token, SLACK_API)
    }

    pub fn with_base_url(token: String, base_url: &str) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Call a Web API method. Slack reports failures as `{"ok": false}`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, BridgeError> {
        trace!(method, "slack api call");
        let value: Value = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(&self.token)
            .form(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let error = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(BridgeError::Api(format!("{method}: {error}")));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Call a cursor-paginated method until the cursor runs out.
    async fn paginate<T, P, I>(
        &self,
        method: &str,
        params: &[(&str, &str)],
        mut split: P,
    ) -> Result<Vec<I>, BridgeError>
    where
        T: DeserializeOwned,
        P: FnMut(T) -> (Vec<I>, String),
    {
        let mut items = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut page_params = params.to_vec();
            page_params.push(("limit", PAGE_LIMIT));
            if !cursor.is_empty() {
                page_params.push(("cursor", cursor.as_str()));
            }
            let page: T = self.call(method, &page_params).await?;
            let (mut page_items, next) = split(page);
            items.append(&mut page_items);
            if next.is_empty() {
                return Ok(items);
            }
            cursor = next;
        }
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn auth_test(&self) -> Result<AuthTest, BridgeError> {
        self.call("auth.test", &[]).await
    }

    async fn users_list(&self) -> Result<Vec<SlackUser>, BridgeError> {
        self.paginate("users.list", &[], |page: UsersList| {
            (page.members, page.response_metadata.next_cursor)
        })
        .await
    }

    async fn user_info(&self, user_id: &str) -> Result<SlackUser, BridgeError> {
        let reply: UserReply = self.call("users.info", &[("user", user_id)]).await?;
        Ok(reply.user)
    }

    async fn bot_info(&self, bot_id: &str) -> Result<SlackBot, BridgeError> {
        let reply: BotReply = self.call("bots.info", &[("bot", bot_id)]).await?;
        Ok(reply.bot)
    }

    async fn conversations_list(&self) -> Result<Vec<SlackChannel>, BridgeError> {
        self.paginate(
            "conversations.list",
            &[
                ("types", "public_channel,private_channel"),
                ("exclude_archived", "true"),
            ],
            |page: ChannelsList| (page.channels, page.response_metadata.next_cursor),
        )
        .await
    }

    async fn conversation_info(&self, channel_id: &str) -> Result<SlackChannel, BridgeError> {
        let reply: ChannelReply = self
            .call("conversations.info", &[("channel", channel_id)])
            .await?;
        Ok(reply.channel)
    }

    async fn conversation_members(&self, channel_id: &str) -> Result<Vec<String>, BridgeError> {
        self.paginate(
            "conversations.members",
            &[("channel", channel_id)],
            |page: MembersList| (page.members, page.response_metadata.next_cursor),
        )
        .await
    }

    async fn join(&self, channel_id: &str) -> Result<SlackChannel, BridgeError> {
        let reply: ChannelReply = self
            .call("conversations.join", &[("channel", channel_id)])
            .await?;
        Ok(reply.channel)
    }

    async fn leave(&self, channel_id: &str) -> Result<(), BridgeError> {
        let _: Value = self
            .call("conversations.leave", &[("channel", channel_id)])
            .await?;
        Ok(())
    }

    async fn invite(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        let _: Value = self
            .call(
                "conversations.invite",
                &[("channel", channel_id), ("users", user_id)],
            )
            .await?;
        Ok(())
    }

    async fn kick(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        let _: Value = self
            .call(
                "conversations.kick",
                &[("channel", channel_id), ("user", user_id)],
            )
            .await?;
        Ok(())
    }

    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<(), BridgeError> {
        let _: Value = self
            .call(
                "conversations.setTopic",
                &[("channel", channel_id), ("topic", topic)],
            )
            .await?;
        Ok(())
    }

    async fn open_dm(&self, user_id: &str) -> Result<String, BridgeError> {
        let reply: ChannelReply = self
            .call("conversations.open", &[("users", user_id)])
            .await?;
        Ok(reply.channel.id)
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<String, BridgeError> {
        let reply: PostReply = self
            .call(
                "chat.postMessage",
                &[("channel", channel_id), ("text", text), ("as_user", "true")],
            )
            .await?;
        Ok(reply.ts)
    }

    async fn set_presence(&self, presence: &str) -> Result<(), BridgeError> {
        let _: Value = self
            .call("users.setPresence", &[("presence", presence)])
            .await?;
        Ok(())
    }

    async fn message_at(
        &self,
        channel_id: &str,
        ts: &str,
    ) -> Result<Option<SlackMessage>, BridgeError> {
        let reply: HistoryReply = self
            .call(
                "conversations.history",
                &[
                    ("channel", channel_id),
                    ("latest", ts),
                    ("inclusive", "true"),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(reply.messages.into_iter().find(|m| m.ts == ts))
    }

    async fn rtm_connect(&self) -> Result<String, BridgeError> {
        let reply: RtmReply = self.call("rtm.connect", &[]).await?;
        Ok(reply.url)
    }
}
