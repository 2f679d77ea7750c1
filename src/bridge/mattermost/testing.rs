//! In-memory Mattermost REST API for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::api::{MattermostApi, MmChannel, MmPost, MmTeam, MmUser};
use crate::error::BridgeError;

pub const ME: &str = "me0000";
pub const TEAM: &str = "team01";

pub struct FakeMattermost {
    users: Mutex<HashMap<String, MmUser>>,
    channels: Mutex<HashMap<String, MmChannel>>,
    members: Mutex<HashMap<String, Vec<String>>>,
    posts: Mutex<HashMap<String, MmPost>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl FakeMattermost {
    pub fn new() -> Self {
        let fake = Self {
            users: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
            posts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        };
        fake.add_user(ME, "me");
        fake
    }

    pub fn add_user(&self, id: &str, username: &str) {
        self.users.lock().insert(
            id.to_string(),
            MmUser {
                id: id.into(),
                username: username.into(),
                ..Default::default()
            },
        );
    }

    pub fn add_channel(&self, id: &str, name: &str, kind: &str) {
        self.channels.lock().insert(
            id.to_string(),
            MmChannel {
                id: id.into(),
                team_id: TEAM.into(),
                name: name.into(),
                display_name: name.into(),
                kind: kind.into(),
                ..Default::default()
            },
        );
    }

    pub fn add_membership(&self, channel_id: &str, user_id: &str) {
        self.members
            .lock()
            .entry(channel_id.to_string())
            .or_default()
            .push(user_id.to_string());
    }

    pub fn add_post(&self, post: MmPost) {
        self.posts.lock().insert(post.id.clone(), post);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn call(&self, entry: String) {
        self.calls.lock().push(entry);
    }

    fn not_found(what: &str) -> BridgeError {
        BridgeError::NotFound(what.to_string())
    }
}

#[async_trait]
impl MattermostApi for FakeMattermost {
    async fn me(&self) -> Result<MmUser, BridgeError> {
        self.user(ME).await
    }

    async fn team_by_name(&self, name: &str) -> Result<MmTeam, BridgeError> {
        if name != "eng" {
            return Err(Self::not_found(name));
        }
        Ok(MmTeam {
            id: TEAM.into(),
            name: name.into(),
            display_name: "Engineering".into(),
        })
    }

    async fn user(&self, user_id: &str) -> Result<MmUser, BridgeError> {
        self.users
            .lock()
            .get(user_id)
            .cloned()
            .ok_or_else(|| Self::not_found(user_id))
    }

    async fn team_users(&self, _team_id: &str) -> Result<Vec<MmUser>, BridgeError> {
        Ok(self.users.lock().values().cloned().collect())
    }

    async fn my_channels(&self, _team_id: &str) -> Result<Vec<MmChannel>, BridgeError> {
        let members = self.members.lock();
        Ok(self
            .channels
            .lock()
            .values()
            .filter(|c| members.get(&c.id).is_some_and(|m| m.iter().any(|u| u == ME)))
            .cloned()
            .collect())
    }

    async fn team_channels(&self, _team_id: &str) -> Result<Vec<MmChannel>, BridgeError> {
        Ok(self
            .channels
            .lock()
            .values()
            .filter(|c| c.kind == "O")
            .cloned()
            .collect())
    }

    async fn channel(&self, channel_id: &str) -> Result<MmChannel, BridgeError> {
        self.channels
            .lock()
            .get(channel_id)
            .cloned()
            .ok_or_else(|| Self::not_found(channel_id))
    }

    async fn channel_by_name(&self, _team_id: &str, name: &str) -> Result<MmChannel, BridgeError> {
        self.channels
            .lock()
            .values()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| Self::not_found(name))
    }

    async fn channel_members(&self, channel_id: &str) -> Result<Vec<String>, BridgeError> {
        Ok(self
            .members
            .lock()
            .get(channel_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_member(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        self.call(format!("add_member {channel_id} {user_id}"));
        self.add_membership(channel_id, user_id);
        Ok(())
    }

    async fn remove_member(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        self.call(format!("remove_member {channel_id} {user_id}"));
        Ok(())
    }

    async fn patch_header(&self, channel_id: &str, header: &str) -> Result<(), BridgeError> {
        self.call(format!("patch_header {channel_id} {header}"));
        Ok(())
    }

    async fn create_post(&self, channel_id: &str, message: &str) -> Result<MmPost, BridgeError> {
        self.call(format!("create_post {channel_id} {message}"));
        let id = format!("post{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let post = MmPost {
            id,
            channel_id: channel_id.into(),
            user_id: ME.into(),
            message: message.into(),
            ..Default::default()
        };
        self.add_post(post.clone());
        Ok(post)
    }

    async fn direct_channel(&self, user_a: &str, user_b: &str) -> Result<MmChannel, BridgeError> {
        self.call(format!("direct_channel {user_a} {user_b}"));
        let id = format!("dm-{user_b}");
        self.add_channel(&id, &format!("{user_a}__{user_b}"), "D");
        self.channel(&id).await
    }

    async fn set_status(&self, user_id: &str, status: &str) -> Result<(), BridgeError> {
        self.call(format!("set_status {user_id} {status}"));
        Ok(())
    }

    async fn post(&self, post_id: &str) -> Result<Option<MmPost>, BridgeError> {
        Ok(self.posts.lock().get(post_id).cloned())
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("https://mm.test/api/v4/files/{file_id}")
    }

    fn websocket_url(&self) -> String {
        "ws://mm.test/api/v4/websocket".into()
    }

    fn token(&self) -> String {
        "token".into()
    }
}
