//! Slack backend.
//!
//! Outbound calls go through [`SlackApi`] (HTTPS Web API); inbound events
//! come from the RTM websocket and pass through [`SlackTranslator`] on their
//! way to the relay.

pub mod api;
mod client;
mod rtm;
pub mod translate;
mod users;

#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use self::api::{AuthTest, SlackApi, SlackChannel};
use self::translate::SlackTranslator;
use self::users::SlackUsers;
use super::{
    BRIDGE_EVENT_QUEUE, Bridge, BridgeContext, BridgeEvent, ChannelInfo, Service, Status,
    UserInfo,
};
use crate::config::SlackConfig;
use crate::error::BridgeError;
use crate::state::PendingEchoes;

pub use client::SlackClient;

/// Apply the login policy once the account is known.
pub fn check_login(auth: &AuthTest, config: &SlackConfig) -> Result<(), BridgeError> {
    let domain = auth.domain();
    if !config.restrict.is_empty() && !config.restrict.iter().any(|d| d == domain) {
        return Err(BridgeError::NotAllowed(format!(
            "not allowed to connect to {domain} slack"
        )));
    }
    if config.deny_users.iter().any(|u| *u == auth.user) {
        return Err(BridgeError::NotAllowed(format!(
            "user {} may not log in",
            auth.user
        )));
    }
    Ok(())
}

/// One logged-in Slack account.
pub struct SlackBridge {
    api: Arc<dyn SlackApi>,
    users: Arc<SlackUsers>,
    me: UserInfo,
    echoes: Arc<PendingEchoes>,
    events: mpsc::Sender<BridgeEvent>,
    connected: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SlackBridge {
    /// Log in, then start streaming events into `ctx.events`.
    pub async fn connect(
        api: Arc<dyn SlackApi>,
        config: &SlackConfig,
        ctx: BridgeContext,
    ) -> Result<Arc<Self>, BridgeError> {
        let bridge = Arc::new(Self::login(api, config, ctx).await?);
        let url = bridge.api.rtm_connect().await?;
        let ws = rtm::open(&url).await?;

        let (raw_tx, raw_rx) = mpsc::channel(BRIDGE_EVENT_QUEUE);
        let translator = SlackTranslator::new(
            bridge.api.clone(),
            bridge.users.clone(),
            bridge.echoes.clone(),
        );
        let reader = tokio::spawn(rtm::read_loop(ws, raw_tx, bridge.connected.clone()));
        let translating = tokio::spawn(translator.run(raw_rx, bridge.events.clone()));
        bridge.tasks.lock().extend([reader, translating]);
        Ok(bridge)
    }

    /// Authenticate and load the account without opening the event stream.
    pub async fn login(
        api: Arc<dyn SlackApi>,
        config: &SlackConfig,
        ctx: BridgeContext,
    ) -> Result<Self, BridgeError> {
        let auth = api.auth_test().await?;
        check_login(&auth, config)?;

        let users = Arc::new(SlackUsers::new(
            api.clone(),
            ctx.ghosts.clone(),
            &auth.team_id,
            auth.domain(),
            &auth.user_id,
            config.prefer_nickname,
        ));
        if let Err(e) = users.preload().await {
            warn!(error = %e, "could not preload slack users");
        }
        let me = users.get(&auth.user_id).await?;
        info!(team = %auth.team, user = %me.nick, "slack login");

        Ok(Self {
            api,
            users,
            me,
            echoes: ctx.echoes,
            events: ctx.events,
            connected: Arc::new(AtomicBool::new(true)),
            tasks: Mutex::new(Vec::new()),
        })
    }

    fn channel_info(&self, channel: SlackChannel) -> ChannelInfo {
        ChannelInfo {
            id: channel.id,
            name: channel.name,
            team_id: self.users.team_id().to_string(),
            topic: channel.topic.value,
            private: channel.is_private || channel.is_mpim,
            direct: channel.is_im,
        }
    }
}

#[async_trait]
impl Bridge for SlackBridge {
    fn protocol(&self) -> Service {
        Service::Slack
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn get_me(&self) -> UserInfo {
        self.me.clone()
    }

    async fn logout(&self) -> Result<(), BridgeError> {
        self.connected.store(false, Ordering::SeqCst);
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        if self.events.try_send(BridgeEvent::Logout).is_err() {
            debug!(user = %self.me.nick, "relay gone or busy, logout not queued");
        }
        debug!(user = %self.me.nick, "slack logout");
        Ok(())
    }

    async fn get_channels(&self) -> Result<Vec<ChannelInfo>, BridgeError> {
        Ok(self
            .api
            .conversations_list()
            .await?
            .into_iter()
            .filter(|c| c.is_member)
            .map(|c| self.channel_info(c))
            .collect())
    }

    async fn get_channel(&self, channel_id: &str) -> Result<ChannelInfo, BridgeError> {
        let channel = self.api.conversation_info(channel_id).await?;
        Ok(self.channel_info(channel))
    }

    async fn get_channel_name(&self, channel_id: &str) -> Result<String, BridgeError> {
        Ok(self.api.conversation_info(channel_id).await?.name)
    }

    async fn get_channel_id(&self, name: &str) -> Result<String, BridgeError> {
        let name = name.trim_start_matches('#');
        self.api
            .conversations_list()
            .await?
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.id)
            .ok_or_else(|| BridgeError::NotFound(name.to_string()))
    }

    async fn get_channel_users(&self, channel_id: &str) -> Result<Vec<UserInfo>, BridgeError> {
        let mut users = Vec::new();
        for member in self.api.conversation_members(channel_id).await? {
            match self.users.get(&member).await {
                Ok(info) => users.push(info),
                Err(e) => debug!(user = %member, error = %e, "skipping unknown member"),
            }
        }
        Ok(users)
    }

    async fn get_users(&self) -> Result<Vec<UserInfo>, BridgeError> {
        self.users.all().await
    }

    async fn get_user(&self, user_id: &str) -> Result<UserInfo, BridgeError> {
        self.users.get(user_id).await
    }

    async fn msg_channel(&self, channel_id: &str, text: &str) -> Result<String, BridgeError> {
        let ts = self.api.post_message(channel_id, text).await?;
        self.echoes.record(channel_id, &ts);
        Ok(ts)
    }

    async fn msg_user(&self, user_id: &str, text: &str) -> Result<String, BridgeError> {
        let dm = self.api.open_dm(user_id).await?;
        let ts = self.api.post_message(&dm, text).await?;
        self.echoes.record(&dm, &ts);
        Ok(ts)
    }

    async fn join(&self, name: &str) -> Result<ChannelInfo, BridgeError> {
        let id = self.get_channel_id(name).await?;
        let channel = self.api.join(&id).await?;
        Ok(self.channel_info(channel))
    }

    async fn part(&self, channel_id: &str) -> Result<(), BridgeError> {
        self.api.leave(channel_id).await
    }

    async fn invite(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        self.api.invite(channel_id, user_id).await
    }

    async fn kick(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        self.api.kick(channel_id, user_id).await
    }

    async fn set_topic(&self, channel_id: &str, text: &str) -> Result<(), BridgeError> {
        self.api.set_topic(channel_id, text).await
    }

    async fn topic(&self, channel_id: &str) -> Result<String, BridgeError> {
        Ok(self.api.conversation_info(channel_id).await?.topic.value)
    }

    async fn set_status(&self, status: Status) -> Result<(), BridgeError> {
        let presence = match status {
            Status::Online => "auto",
            Status::Away => "away",
        };
        self.api.set_presence(presence).await
    }

    async fn list(&self) -> Result<Vec<ChannelInfo>, BridgeError> {
        Ok(self
            .api
            .conversations_list()
            .await?
            .into_iter()
            .map(|c| self.channel_info(c))
            .collect())
    }
}
