//! Mattermost backend.
//!
//! REST v4 for actions and lookups, the v4 websocket for events.

pub mod api;
mod client;
pub mod translate;
mod users;
mod ws;

#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use self::api::{MattermostApi, MmChannel};
use self::translate::MattermostTranslator;
use self::users::MattermostUsers;
use super::{
    BRIDGE_EVENT_QUEUE, Bridge, BridgeContext, BridgeEvent, ChannelInfo, Service, Status,
    UserInfo,
};
use crate::error::BridgeError;
use crate::state::PendingEchoes;

pub use client::MattermostClient;

/// One logged-in Mattermost account in one team.
pub struct MattermostBridge {
    api: Arc<dyn MattermostApi>,
    users: Arc<MattermostUsers>,
    me: UserInfo,
    echoes: Arc<PendingEchoes>,
    events: mpsc::Sender<BridgeEvent>,
    connected: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MattermostBridge {
    /// Resolve the team and account, then start streaming events.
    pub async fn connect(
        api: Arc<dyn MattermostApi>,
        team: &str,
        ctx: BridgeContext,
    ) -> Result<Arc<Self>, BridgeError> {
        let bridge = Arc::new(Self::login(api, team, ctx).await?);
        let ws = ws::open(&bridge.api.websocket_url(), &bridge.api.token()).await?;

        let (raw_tx, raw_rx) = mpsc::channel(BRIDGE_EVENT_QUEUE);
        let translator = MattermostTranslator::new(
            bridge.api.clone(),
            bridge.users.clone(),
            bridge.echoes.clone(),
        );
        let reader = tokio::spawn(ws::read_loop(ws, raw_tx, bridge.connected.clone()));
        let translating = tokio::spawn(translator.run(raw_rx, bridge.events.clone()));
        bridge.tasks.lock().extend([reader, translating]);
        Ok(bridge)
    }

    /// Resolve the team and account without opening the event stream.
    pub async fn login(
        api: Arc<dyn MattermostApi>,
        team: &str,
        ctx: BridgeContext,
    ) -> Result<Self, BridgeError> {
        let me = api.me().await?;
        let team = api.team_by_name(team).await?;
        let host = host_of(&api.websocket_url());

        let users = Arc::new(MattermostUsers::new(
            api.clone(),
            ctx.ghosts.clone(),
            &team.id,
            &host,
            &me.id,
        ));
        if let Err(e) = users.preload().await {
            warn!(error = %e, "could not preload mattermost users");
        }
        let me = users.convert(&me);
        info!(team = %team.name, user = %me.nick, "mattermost login");

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

    fn channel_info(&self, channel: MmChannel) -> ChannelInfo {
        let direct = channel.is_direct();
        let private = matches!(channel.kind.as_str(), "P" | "G");
        ChannelInfo {
            id: channel.id,
            name: channel.name,
            team_id: channel.team_id,
            topic: channel.header,
            private,
            direct,
        }
    }
}

/// Host part of a server URL, used as the host of every ghost.
fn host_of(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', ':']).next().unwrap_or(rest).to_string()
}

#[async_trait]
impl Bridge for MattermostBridge {
    fn protocol(&self) -> Service {
        Service::Mattermost
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
        debug!(user = %self.me.nick, "mattermost logout");
        Ok(())
    }

    async fn get_channels(&self) -> Result<Vec<ChannelInfo>, BridgeError> {
        Ok(self
            .api
            .my_channels(self.users.team_id())
            .await?
            .into_iter()
            .map(|c| self.channel_info(c))
            .collect())
    }

    async fn get_channel(&self, channel_id: &str) -> Result<ChannelInfo, BridgeError> {
        let channel = self.api.channel(channel_id).await?;
        Ok(self.channel_info(channel))
    }

    async fn get_channel_name(&self, channel_id: &str) -> Result<String, BridgeError> {
        Ok(self.api.channel(channel_id).await?.name)
    }

    async fn get_channel_id(&self, name: &str) -> Result<String, BridgeError> {
        let name = name.trim_start_matches('#');
        Ok(self
            .api
            .channel_by_name(self.users.team_id(), name)
            .await?
            .id)
    }

    async fn get_channel_users(&self, channel_id: &str) -> Result<Vec<UserInfo>, BridgeError> {
        let mut users = Vec::new();
        for member in self.api.channel_members(channel_id).await? {
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
        let post = self.api.create_post(channel_id, text).await?;
        self.echoes.record(channel_id, &post.id);
        Ok(post.id)
    }

    async fn msg_user(&self, user_id: &str, text: &str) -> Result<String, BridgeError> {
        let dm = self.api.direct_channel(&self.me.id, user_id).await?;
        let post = self.api.create_post(&dm.id, text).await?;
        self.echoes.record(&dm.id, &post.id);
        Ok(post.id)
    }

    async fn join(&self, name: &str) -> Result<ChannelInfo, BridgeError> {
        let channel = self
            .api
            .channel_by_name(self.users.team_id(), name.trim_start_matches('#'))
            .await?;
        self.api.add_member(&channel.id, &self.me.id).await?;
        Ok(self.channel_info(channel))
    }

    async fn part(&self, channel_id: &str) -> Result<(), BridgeError> {
        self.api.remove_member(channel_id, &self.me.id).await
    }

    async fn invite(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        self.api.add_member(channel_id, user_id).await
    }

    async fn kick(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        self.api.remove_member(channel_id, user_id).await
    }

    async fn set_topic(&self, channel_id: &str, text: &str) -> Result<(), BridgeError> {
        self.api.patch_header(channel_id, text).await
    }

    async fn topic(&self, channel_id: &str) -> Result<String, BridgeError> {
        Ok(self.api.channel(channel_id).await?.header)
    }

    async fn set_status(&self, status: Status) -> Result<(), BridgeError> {
        let status = match status {
            Status::Online => "online",
            Status::Away => "away",
        };
        self.api.set_status(&self.me.id, status).await
    }

    async fn list(&self) -> Result<Vec<ChannelInfo>, BridgeError> {
        Ok(self
            .api
            .team_channels(self.users.team_id())
            .await?
            .into_iter()
            .map(|c| self.channel_info(c))
            .collect())
    }
}
