//! In-memory Slack Web API for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::api::{AuthTest, SlackApi, SlackBot, SlackChannel, SlackMessage, SlackUser};
use crate::error::BridgeError;

pub struct FakeSlack {
    auth: Mutex<AuthTest>,
    users: Mutex<HashMap<String, SlackUser>>,
    channels: Mutex<HashMap<String, SlackChannel>>,
    members: Mutex<HashMap<String, Vec<String>>>,
    messages: Mutex<Vec<SlackMessage>>,
    calls: Mutex<Vec<String>>,
    next_ts: AtomicU64,
}

impl FakeSlack {
    pub fn new() -> Self {
        Self {
            auth: Mutex::new(AuthTest {
                url: "https://example.slack.com/".into(),
                team: "Example".into(),
                user: "me".into(),
                team_id: "T1".into(),
                user_id: "UME".into(),
            }),
            users: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
            messages: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            next_ts: AtomicU64::new(1_700_000_000),
        }
    }

    pub fn set_auth(&self, auth: AuthTest) {
        *self.auth.lock() = auth;
    }

    pub fn add_user(&self, user: SlackUser) {
        self.users.lock().insert(user.id.clone(), user);
    }

    pub fn add_channel(&self, channel: SlackChannel) {
        self.channels.lock().insert(channel.id.clone(), channel);
    }

    pub fn add_member(&self, channel_id: &str, user_id: &str) {
        self.members
            .lock()
            .entry(channel_id.to_string())
            .or_default()
            .push(user_id.to_string());
    }

    pub fn add_message(&self, message: SlackMessage) {
        self.messages.lock().push(message);
    }

    /// Every call as `method args...`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.split(' ').next() == Some(method))
            .count()
    }

    fn call(&self, entry: String) {
        self.calls.lock().push(entry);
    }

    fn channel(&self, channel_id: &str) -> Result<SlackChannel, BridgeError> {
        self.channels
            .lock()
            .get(channel_id)
            .cloned()
            .ok_or_else(|| BridgeError::Api("channel_not_found".into()))
    }
}

#[async_trait]
impl SlackApi for FakeSlack {
    async fn auth_test(&self) -> Result<AuthTest, BridgeError> {
        self.call("auth.test".into());
        Ok(self.auth.lock().clone())
    }

    async fn users_list(&self) -> Result<Vec<SlackUser>, BridgeError> {
        self.call("users.list".into());
        Ok(self.users.lock().values().cloned().collect())
    }

    async fn user_info(&self, user_id: &str) -> Result<SlackUser, BridgeError> {
        self.call(format!("users.info {user_id}"));
        self.users
            .lock()
            .get(user_id)
            .cloned()
            .ok_or_else(|| BridgeError::Api("user_not_found".into()))
    }

    async fn bot_info(&self, bot_id: &str) -> Result<SlackBot, BridgeError> {
        self.call(format!("bots.info {bot_id}"));
        Err(BridgeError::Api("bot_not_found".into()))
    }

    async fn conversations_list(&self) -> Result<Vec<SlackChannel>, BridgeError> {
        self.call("conversations.list".into());
        Ok(self.channels.lock().values().cloned().collect())
    }

    async fn conversation_info(&self, channel_id: &str) -> Result<SlackChannel, BridgeError> {
        self.call(format!("conversations.info {channel_id}"));
        self.channel(channel_id)
    }

    async fn conversation_members(&self, channel_id: &str) -> Result<Vec<String>, BridgeError> {
        self.call(format!("conversations.members {channel_id}"));
        Ok(self
            .members
            .lock()
            .get(channel_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn join(&self, channel_id: &str) -> Result<SlackChannel, BridgeError> {
        self.call(format!("conversations.join {channel_id}"));
        let me = self.auth.lock().user_id.clone();
        self.add_member(channel_id, &me);
        let mut channel = self.channel(channel_id)?;
        channel.is_member = true;
        self.add_channel(channel.clone());
        Ok(channel)
    }

    async fn leave(&self, channel_id: &str) -> Result<(), BridgeError> {
        self.call(format!("conversations.leave {channel_id}"));
        Ok(())
    }

    async fn invite(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        self.call(format!("conversations.invite {channel_id} {user_id}"));
        Ok(())
    }

    async fn kick(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        self.call(format!("conversations.kick {channel_id} {user_id}"));
        Ok(())
    }

    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<(), BridgeError> {
        self.call(format!("conversations.setTopic {channel_id} {topic}"));
        Ok(())
    }

    async fn open_dm(&self, user_id: &str) -> Result<String, BridgeError> {
        self.call(format!("conversations.open {user_id}"));
        Ok(format!("D{user_id}"))
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<String, BridgeError> {
        self.call(format!("chat.postMessage {channel_id} {text}"));
        let ts = self.next_ts.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{ts}.000100"))
    }

    async fn set_presence(&self, presence: &str) -> Result<(), BridgeError> {
        self.call(format!("users.setPresence {presence}"));
        Ok(())
    }

    async fn message_at(
        &self,
        channel_id: &str,
        ts: &str,
    ) -> Result<Option<SlackMessage>, BridgeError> {
        self.call(format!("conversations.history {channel_id} {ts}"));
        Ok(self
            .messages
            .lock()
            .iter()
            .find(|m| m.channel == channel_id && m.ts == ts)
            .cloned())
    }

    async fn rtm_connect(&self) -> Result<String, BridgeError> {
        self.call("rtm.connect".into());
        Err(BridgeError::NotConnected)
    }
}
