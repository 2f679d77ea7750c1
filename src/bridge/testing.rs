//! In-memory bridge for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use super::{
    Bridge, BridgeContext, BridgeEvent, ChannelInfo, Connector, Credentials, Service, Status, UserInfo,
};
use crate::error::BridgeError;
use crate::state::PendingEchoes;

/// A backend whose state lives in memory. Every action is appended to
/// [`FakeBridge::calls`].
pub struct FakeBridge {
    me: UserInfo,
    service: Service,
    channels: Mutex<HashMap<String, ChannelInfo>>,
    members: Mutex<HashMap<String, Vec<UserInfo>>>,
    users: Mutex<HashMap<String, UserInfo>>,
    calls: Mutex<Vec<String>>,
    echoes: Mutex<Option<Arc<PendingEchoes>>>,
    events: Mutex<Option<mpsc::Sender<BridgeEvent>>>,
    next_id: AtomicU64,
    logged_out: AtomicBool,
}

impl FakeBridge {
    pub fn new(id: &str, nick: &str) -> Self {
        let me = UserInfo {
            id: id.into(),
            nick: nick.into(),
            user: id.into(),
            host: "fake".into(),
            team_id: "T1".into(),
            me: true,
            ..Default::default()
        };
        let mut users = HashMap::new();
        users.insert(me.id.clone(), me.clone());
        Self {
            me,
            service: Service::Slack,
            channels: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
            users: Mutex::new(users),
            calls: Mutex::new(Vec::new()),
            echoes: Mutex::new(None),
            events: Mutex::new(None),
            next_id: AtomicU64::new(100),
            logged_out: AtomicBool::new(false),
        }
    }

    pub fn add_channel(&self, info: ChannelInfo) {
        self.channels.lock().insert(info.id.clone(), info);
    }

    pub fn add_user(&self, info: UserInfo) {
        self.users.lock().insert(info.id.clone(), info);
    }

    pub fn add_member(&self, channel_id: &str, info: UserInfo) {
        self.add_user(info.clone());
        self.members
            .lock()
            .entry(channel_id.to_string())
            .or_default()
            .push(info);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }

    fn attach(&self, ctx: &BridgeContext) {
        *self.echoes.lock() = Some(ctx.echoes.clone());
        *self.events.lock() = Some(ctx.events.clone());
    }

    fn call(&self, entry: String) {
        self.calls.lock().push(entry);
    }

    fn post(&self, target: &str, text: &str) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        if let Some(echoes) = self.echoes.lock().as_ref() {
            echoes.record(target, &id);
        }
        self.call(format!("msg {target} {text}"));
        id
    }

    fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo, BridgeError> {
        self.channels
            .lock()
            .get(channel_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(channel_id.to_string()))
    }
}

#[async_trait]
impl Bridge for FakeBridge {
    fn protocol(&self) -> Service {
        self.service
    }

    fn connected(&self) -> bool {
        !self.logged_out()
    }

    fn get_me(&self) -> UserInfo {
        self.me.clone()
    }

    async fn logout(&self) -> Result<(), BridgeError> {
        self.logged_out.store(true, Ordering::SeqCst);
        if let Some(events) = self.events.lock().take() {
            let _ = events.try_send(BridgeEvent::Logout);
        }
        Ok(())
    }

    async fn get_channels(&self) -> Result<Vec<ChannelInfo>, BridgeError> {
        let members = self.members.lock();
        Ok(self
            .channels
            .lock()
            .values()
            .filter(|c| {
                members
                    .get(&c.id)
                    .is_some_and(|m| m.iter().any(|u| u.id == self.me.id))
            })
            .cloned()
            .collect())
    }

    async fn get_channel(&self, channel_id: &str) -> Result<ChannelInfo, BridgeError> {
        self.channel_info(channel_id)
    }

    async fn get_channel_name(&self, channel_id: &str) -> Result<String, BridgeError> {
        self.channel_info(channel_id).map(|c| c.name)
    }

    async fn get_channel_id(&self, name: &str) -> Result<String, BridgeError> {
        self.channels
            .lock()
            .values()
            .find(|c| c.name == name)
            .map(|c| c.id.clone())
            .ok_or_else(|| BridgeError::NotFound(name.to_string()))
    }

    async fn get_channel_users(&self, channel_id: &str) -> Result<Vec<UserInfo>, BridgeError> {
        Ok(self
            .members
            .lock()
            .get(channel_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_users(&self) -> Result<Vec<UserInfo>, BridgeError> {
        Ok(self.users.lock().values().cloned().collect())
    }

    async fn get_user(&self, user_id: &str) -> Result<UserInfo, BridgeError> {
        self.users
            .lock()
            .get(user_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(user_id.to_string()))
    }

    async fn msg_channel(&self, channel_id: &str, text: &str) -> Result<String, BridgeError> {
        Ok(self.post(channel_id, text))
    }

    async fn msg_user(&self, user_id: &str, text: &str) -> Result<String, BridgeError> {
        Ok(self.post(user_id, text))
    }

    async fn join(&self, name: &str) -> Result<ChannelInfo, BridgeError> {
        self.call(format!("join {name}"));
        let existing = self
            .channels
            .lock()
            .values()
            .find(|c| c.name == name)
            .cloned();
        let info = existing.unwrap_or_else(|| ChannelInfo {
            id: format!("C{}", name.to_uppercase()),
            name: name.to_string(),
            ..Default::default()
        });
        self.add_channel(info.clone());
        self.add_member(&info.id, self.me.clone());
        Ok(info)
    }

    async fn part(&self, channel_id: &str) -> Result<(), BridgeError> {
        self.call(format!("part {channel_id}"));
        Ok(())
    }

    async fn invite(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        self.call(format!("invite {channel_id} {user_id}"));
        Ok(())
    }

    async fn kick(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        self.call(format!("kick {channel_id} {user_id}"));
        Ok(())
    }

    async fn set_topic(&self, channel_id: &str, text: &str) -> Result<(), BridgeError> {
        self.call(format!("topic {channel_id} {text}"));
        if let Some(info) = self.channels.lock().get_mut(channel_id) {
            info.topic = text.to_string();
        }
        Ok(())
    }

    async fn topic(&self, channel_id: &str) -> Result<String, BridgeError> {
        self.channel_info(channel_id).map(|c| c.topic)
    }

    async fn set_status(&self, status: Status) -> Result<(), BridgeError> {
        self.call(format!("status {status:?}"));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ChannelInfo>, BridgeError> {
        Ok(self.channels.lock().values().cloned().collect())
    }
}

/// Connector that hands out a prepared [`FakeBridge`], or rejects every
/// login when none is set.
#[derive(Default)]
pub struct FakeConnector {
    bridge: Option<Arc<FakeBridge>>,
    attempts: Mutex<Vec<Credentials>>,
    context: Mutex<Option<BridgeContext>>,
    delay: Option<Duration>,
}

impl FakeConnector {
    pub fn with_bridge(bridge: Arc<FakeBridge>) -> Self {
        Self {
            bridge: Some(bridge),
            ..Default::default()
        }
    }

    /// Answer every login only after `delay`.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn attempts(&self) -> Vec<Credentials> {
        self.attempts.lock().clone()
    }

    /// Context of the last successful login, for injecting events.
    pub fn context(&self) -> Option<BridgeContext> {
        self.context.lock().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        credentials: Credentials,
        ctx: BridgeContext,
    ) -> Result<Arc<dyn Bridge>, BridgeError> {
        self.attempts.lock().push(credentials);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let Some(bridge) = &self.bridge else {
            return Err(BridgeError::Credentials("rejected".into()));
        };
        bridge.attach(&ctx);
        *self.context.lock() = Some(ctx);
        Ok(bridge.clone())
    }
}
