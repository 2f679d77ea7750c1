//! The per-connection registry.
//!
//! A [`Server`] owns every [`User`] and [`Channel`] one IRC connection can
//! see: the local user, the service users and the ghosts materialized for
//! remote backend participants. Directory mutations happen under a single
//! `RwLock` that is never held across an `.await`; messages are sent after
//! the guard is dropped.

use chrono::{DateTime, Utc};
use irc_proto::{Command, Message, Prefix, Response};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, warn};

use super::casemap::{irc_eq, irc_to_lower, is_valid_nick, sanitize_nick};
use super::channel::Channel;
use super::echo::PendingEchoes;
use super::ghosts::GhostCache;
use super::uid::UidGenerator;
use super::user::User;
use crate::bridge::{
    BRIDGE_EVENT_QUEUE, Bridge, BridgeContext, Connector, Credentials, Service, UserInfo,
};
use crate::config::Config;
use crate::error::{HandlerError, HandshakeError};
use crate::handlers::{Context, Registry, server_reply};
use crate::network::handshake;
use crate::telemetry::spans;

/// Process-wide context shared by every connection.
pub struct Shared {
    pub config: Config,
    pub connector: Arc<dyn Connector>,
    pub ghosts: Arc<GhostCache>,
    pub uids: UidGenerator,
    pub registry: Registry,
    pub created: DateTime<Utc>,
}

impl Shared {
    pub fn new(config: Config, connector: Arc<dyn Connector>) -> Arc<Self> {
        let ghosts = Arc::new(GhostCache::new(config.ghosts.max_entries));
        let uids = UidGenerator::new(config.server.sid.clone());
        Arc::new(Self {
            config,
            connector,
            ghosts,
            uids,
            registry: Registry::new(),
            created: Utc::now(),
        })
    }
}

#[derive(Default)]
struct Directory {
    /// All users keyed by normalized nick.
    users: HashMap<String, Arc<User>>,
    channels_by_id: HashMap<String, Arc<Channel>>,
    /// Keyed by normalized IRC name.
    channels_by_name: HashMap<String, Arc<Channel>>,
    /// Ghosts keyed by backend user id.
    ghosts: HashMap<String, Arc<User>>,
}

/// Registry of one IRC connection.
pub struct Server {
    shared: Arc<Shared>,
    directory: RwLock<Directory>,
    services: HashMap<Service, Arc<User>>,
    /// The connection's own user, once the handshake has started.
    local: RwLock<Option<Arc<User>>>,
    echoes: Arc<PendingEchoes>,
}

impl Server {
    pub fn new(shared: Arc<Shared>) -> Arc<Self> {
        let mut directory = Directory::default();
        let mut services = HashMap::new();
        for (slot, service) in Service::all().into_iter().enumerate() {
            let user = Arc::new(User::ghost(
                shared.uids.reserved(slot as u64),
                UserInfo {
                    nick: service.name().to_string(),
                    user: service.name().to_string(),
                    real: format!("{service} service"),
                    host: "service".to_string(),
                    ..Default::default()
                },
            ));
            directory
                .users
                .insert(service.name().to_string(), user.clone());
            services.insert(service, user);
        }

        Arc::new(Self {
            shared,
            directory: RwLock::new(directory),
            services,
            local: RwLock::new(None),
            echoes: Arc::new(PendingEchoes::new()),
        })
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.shared.config.server.name
    }

    pub fn version(&self) -> &str {
        &self.shared.config.server.version
    }

    pub fn motd(&self) -> &[String] {
        &self.shared.config.server.motd
    }

    pub fn prefix(&self) -> Prefix {
        Prefix::ServerName(self.name().to_string())
    }

    pub fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn echoes(&self) -> &Arc<PendingEchoes> {
        &self.echoes
    }

    /// Build a numeric addressed to `user`; `params` follow the nick.
    pub fn encode_message(&self, user: &User, response: Response, params: Vec<String>) -> Message {
        let mut args = Vec::with_capacity(params.len() + 1);
        args.push(user.nick());
        args.extend(params);
        server_reply(self.name(), response, args)
    }

    pub async fn send_numeric(&self, user: &User, response: Response, params: Vec<String>) {
        user.send(self.encode_message(user, response, params)).await;
    }

    pub(crate) fn truncate_nick(&self, nick: &str) -> String {
        nick.chars()
            .take(self.shared.config.server.max_nick_len)
            .collect()
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Create the connection's own user; it is registered by [`Server::connect`].
    pub fn new_local_user(&self, host: String, outbound: mpsc::Sender<Message>) -> Arc<User> {
        Arc::new(User::local(self.shared.uids.next(), host, outbound))
    }

    pub fn local_user(&self) -> Option<Arc<User>> {
        self.local.read().clone()
    }

    pub(crate) fn set_local_user(&self, user: Option<Arc<User>>) {
        *self.local.write() = user;
    }

    /// The logged-in backend, if any.
    pub fn bridge(&self) -> Option<Arc<dyn Bridge>> {
        self.local_user().and_then(|user| user.bridge())
    }

    pub fn service_user(&self, service: Service) -> Option<Arc<User>> {
        self.services.get(&service).cloned()
    }

    /// Which service `user` is, if it is a service user.
    pub fn service_of(&self, user: &User) -> Option<Service> {
        self.services
            .iter()
            .find(|(_, service_user)| service_user.uid == user.uid)
            .map(|(service, _)| *service)
    }

    pub fn has_user(&self, nick: &str) -> Option<Arc<User>> {
        self.directory.read().users.get(&irc_to_lower(nick)).cloned()
    }

    /// Look a user up by backend user id.
    pub fn has_user_id(&self, backend_id: &str) -> Option<Arc<User>> {
        if backend_id.is_empty() {
            return None;
        }
        let dir = self.directory.read();
        dir.ghosts.get(backend_id).cloned().or_else(|| {
            dir.users
                .values()
                .find(|u| !u.is_ghost() && u.backend_id() == backend_id)
                .cloned()
        })
    }

    /// Insert keyed by normalized nick. Fails if the nick is taken.
    pub fn add(&self, user: &Arc<User>) -> bool {
        let key = irc_to_lower(&user.nick());
        if key.is_empty() {
            return false;
        }
        let mut dir = self.directory.write();
        if dir.users.contains_key(&key) {
            return false;
        }
        dir.users.insert(key, user.clone());
        true
    }

    /// Insert several users under one lock; taken nicks are skipped.
    pub fn batch_add(&self, users: &[Arc<User>]) {
        let mut dir = self.directory.write();
        for user in users {
            let key = irc_to_lower(&user.nick());
            if !key.is_empty() && !dir.users.contains_key(&key) {
                dir.users.insert(key, user.clone());
            }
        }
    }

    /// Get or materialize the ghost for a backend identity.
    ///
    /// A preferred nick that is taken gets `_` appended until unique.
    pub fn ghost(&self, info: &UserInfo) -> Arc<User> {
        if !info.id.is_empty()
            && let Some(ghost) = self.directory.read().ghosts.get(&info.id)
        {
            return ghost.clone();
        }

        let mut nick = if is_valid_nick(&info.nick) {
            info.nick.clone()
        } else {
            sanitize_nick(&info.nick)
        };
        nick = self.truncate_nick(&nick);
        let host = if info.host.is_empty() {
            "host".to_string()
        } else {
            info.host.clone()
        };

        let mut dir = self.directory.write();
        if !info.id.is_empty()
            && let Some(ghost) = dir.ghosts.get(&info.id)
        {
            return ghost.clone();
        }
        while dir.users.contains_key(&irc_to_lower(&nick)) {
            nick.push('_');
        }

        let ghost = Arc::new(User::ghost(
            self.shared.uids.next(),
            UserInfo {
                nick: nick.clone(),
                host,
                me: false,
                ..info.clone()
            },
        ));
        dir.users.insert(irc_to_lower(&nick), ghost.clone());
        if !info.id.is_empty() {
            dir.ghosts.insert(info.id.clone(), ghost.clone());
        }
        debug!(nick = %nick, backend_id = %info.id, "materialized ghost");
        ghost
    }

    /// Change `user`'s nick and announce it to everyone sharing a channel.
    ///
    /// On collision the user is left unchanged.
    pub async fn rename_user(&self, user: &Arc<User>, nick: &str) -> Result<(), HandlerError> {
        let nick = self.truncate_nick(nick);
        if nick.is_empty() {
            return Err(HandlerError::NeedMoreParams("NICK"));
        }

        let old_prefix = {
            let mut dir = self.directory.write();
            let old_nick = user.nick();
            if old_nick == nick {
                return Ok(());
            }
            let old_key = irc_to_lower(&old_nick);
            let new_key = irc_to_lower(&nick);
            if new_key != old_key
                && let Some(holder) = dir.users.get(&new_key)
                && !Arc::ptr_eq(holder, user)
            {
                return Err(HandlerError::NicknameInUse(nick));
            }
            if dir.users.get(&old_key).is_some_and(|u| Arc::ptr_eq(u, user)) {
                dir.users.remove(&old_key);
            }
            dir.users.insert(new_key, user.clone());
            let prefix = user.prefix();
            user.set_nick(&nick);
            prefix
        };

        info!(uid = %user.uid, nick = %nick, "nick changed");

        let msg = Message {
            tags: None,
            prefix: Some(old_prefix),
            command: Command::NICK(nick),
        };
        let mut seen = std::collections::HashSet::new();
        seen.insert(user.uid.clone());
        user.send(msg.clone()).await;
        for channel in self.user_channels(user) {
            for member in channel.members() {
                if seen.insert(member.uid.clone()) {
                    member.send(msg.clone()).await;
                }
            }
        }
        Ok(())
    }

    fn remove_user(&self, user: &Arc<User>) {
        let key = irc_to_lower(&user.nick());
        let mut dir = self.directory.write();
        if dir.users.get(&key).is_some_and(|u| Arc::ptr_eq(u, user)) {
            dir.users.remove(&key);
        }
    }

    pub fn users(&self) -> Vec<Arc<User>> {
        self.directory.read().users.values().cloned().collect()
    }

    pub fn user_count(&self) -> usize {
        self.directory.read().users.len()
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    /// Get or create the channel with backend id `id`.
    ///
    /// Metadata comes from the logged-in bridge. A failed lookup still
    /// creates the channel with empty metadata; ids in the local namespace
    /// (`#`, `&`) are never looked up.
    pub async fn channel(&self, id: &str) -> Arc<Channel> {
        if let Some(ch) = self.directory.read().channels_by_id.get(id) {
            return ch.clone();
        }

        let local = id.starts_with('#') || id.starts_with('&');
        let bridge = if local { None } else { self.bridge() };
        let (name, topic, private, service) = match bridge {
            Some(bridge) => match bridge.get_channel(id).await {
                Ok(info) => (info.name, info.topic, info.private, Some(bridge.protocol())),
                Err(e) => {
                    warn!(channel = %id, error = %e, "channel metadata lookup failed");
                    let name = bridge
                        .get_channel_name(id)
                        .await
                        .unwrap_or_else(|_| id.to_string());
                    (name, String::new(), false, Some(bridge.protocol()))
                }
            },
            None => {
                if !local {
                    debug!(channel = %id, "no backend for channel lookup");
                }
                (id.to_string(), String::new(), false, None)
            }
        };

        self.insert_channel(id, &irc_channel_name(&name), topic, private, service)
    }

    /// Get or create a channel that exists only on this server.
    pub fn local_channel(&self, name: &str) -> Arc<Channel> {
        if let Some(ch) = self.has_channel(name) {
            return ch;
        }
        self.insert_channel(&irc_to_lower(name), name, String::new(), false, None)
    }

    /// Insert unless another task created the id first, in which case that
    /// instance wins.
    fn insert_channel(
        &self,
        id: &str,
        name: &str,
        topic: String,
        private: bool,
        service: Option<Service>,
    ) -> Arc<Channel> {
        let mut dir = self.directory.write();
        if let Some(existing) = dir.channels_by_id.get(id) {
            return existing.clone();
        }

        let mut name = name.to_string();
        if dir.channels_by_name.contains_key(&irc_to_lower(&name)) {
            name = format!("{name}-{id}");
        }

        let ch = Arc::new(Channel::new(
            id.to_string(),
            name.clone(),
            service,
            self.name().to_string(),
            topic,
            private,
        ));
        dir.channels_by_id.insert(id.to_string(), ch.clone());
        dir.channels_by_name.insert(irc_to_lower(&name), ch.clone());
        debug!(channel_id = %id, channel = %name, "new channel");
        ch
    }

    /// Look a channel up by id, then by IRC name.
    pub fn has_channel(&self, key: &str) -> Option<Arc<Channel>> {
        let dir = self.directory.read();
        dir.channels_by_id
            .get(key)
            .or_else(|| dir.channels_by_name.get(&irc_to_lower(key)))
            .cloned()
    }

    /// Remove both keys of `ch`, only if they still refer to `ch`.
    pub fn unlink_channel(&self, ch: &Arc<Channel>) {
        let mut dir = self.directory.write();
        let stored = dir
            .channels_by_id
            .get(ch.id())
            .is_some_and(|stored| Arc::ptr_eq(stored, ch));
        if !stored {
            return;
        }
        dir.channels_by_id.remove(ch.id());
        let name_key = irc_to_lower(ch.name());
        if dir
            .channels_by_name
            .get(&name_key)
            .is_some_and(|stored| Arc::ptr_eq(stored, ch))
        {
            dir.channels_by_name.remove(&name_key);
        }
        debug!(channel = %ch.name(), "unlinked channel");
    }

    pub fn channels(&self) -> Vec<Arc<Channel>> {
        self.directory.read().channels_by_id.values().cloned().collect()
    }

    pub fn channel_count(&self) -> usize {
        self.directory.read().channels_by_id.len()
    }

    /// Channels `user` is currently in.
    pub fn user_channels(&self, user: &User) -> Vec<Arc<Channel>> {
        let ids = user.channel_ids();
        let dir = self.directory.read();
        ids.iter()
            .filter_map(|id| dir.channels_by_id.get(id).cloned())
            .collect()
    }

    /// Part `user` from `ch` and discard the channel if it is now empty.
    pub async fn part_channel(&self, user: &User, ch: &Arc<Channel>, reason: Option<&str>) {
        ch.part(user, reason).await;
        if self.shared.config.server.discard_empty && ch.is_empty() {
            self.unlink_channel(ch);
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Run the handshake for the connection's user.
    ///
    /// On success the user is registered, the welcome burst is sent and, if
    /// PASS supplied credentials, a backend login starts in the background.
    /// On failure the user's queue is closed and it never enters the
    /// registry.
    pub async fn connect(
        self: &Arc<Self>,
        user: &Arc<User>,
        inbound: &mut mpsc::Receiver<Message>,
    ) -> Result<(), HandshakeError> {
        self.set_local_user(Some(user.clone()));

        let pass = match handshake::negotiate(self, user, inbound).await {
            Ok(pass) => pass,
            Err(e) => {
                user.close();
                self.set_local_user(None);
                return Err(e);
            }
        };

        info!(nick = %user.nick(), uid = %user.uid, "client registered");
        self.welcome(user).await;

        if let Some(args) = pass {
            let server = self.clone();
            let user = user.clone();
            tokio::spawn(async move {
                let service = if args.len() == 1 {
                    Service::Slack
                } else {
                    Service::Mattermost
                };
                server.login(&user, service, &args).await;
            });
        }
        Ok(())
    }

    /// Process commands until the client quits or disconnects.
    ///
    /// Every line is dispatched as its own task; handlers are not ordered
    /// relative to each other.
    pub async fn handle(self: &Arc<Self>, user: &Arc<User>, mut inbound: mpsc::Receiver<Message>) {
        let (quit_tx, mut quit_rx) = mpsc::channel::<Option<String>>(1);

        let reason = loop {
            tokio::select! {
                msg = inbound.recv() => {
                    let Some(msg) = msg else {
                        break Some("Connection closed".to_string());
                    };
                    let ctx = Context {
                        server: self.clone(),
                        user: user.clone(),
                    };
                    let quit_tx = quit_tx.clone();
                    tokio::spawn(async move {
                        if let Err(HandlerError::Quit(reason)) =
                            ctx.server.shared.registry.dispatch(&ctx, &msg).await
                        {
                            let _ = quit_tx.try_send(reason);
                        }
                    });
                }
                Some(reason) = quit_rx.recv() => break reason,
            }
        };

        self.quit(user, reason).await;
    }

    /// Leave every channel, drop the ghosts and forget the backend session.
    pub async fn logout(&self, user: &Arc<User>) {
        for ch in self.user_channels(user) {
            ch.part(user, None).await;
        }

        let ghosts: Vec<Arc<User>> = {
            let mut dir = self.directory.write();
            let ghosts: Vec<Arc<User>> = dir.ghosts.drain().map(|(_, ghost)| ghost).collect();
            for ghost in &ghosts {
                let key = irc_to_lower(&ghost.nick());
                if dir.users.get(&key).is_some_and(|u| Arc::ptr_eq(u, ghost)) {
                    dir.users.remove(&key);
                }
            }
            ghosts
        };
        for ghost in &ghosts {
            for ch in self.user_channels(ghost) {
                ch.remove_member(ghost);
            }
        }

        if self.shared.config.server.discard_empty {
            for ch in self.channels() {
                if ch.is_empty() {
                    self.unlink_channel(&ch);
                }
            }
        }

        if user.take_bridge().is_some() {
            info!(nick = %user.nick(), "logged out of backend");
        }
        user.clear_backend_identity();
    }

    /// Tear down the user: logout, backend logout, registry removal and
    /// closing of the outbound queue. Call once per user.
    pub async fn quit(&self, user: &Arc<User>, reason: Option<String>) {
        // A login finishing after this point sees the user gone.
        self.remove_user(user);
        let bridge = user.bridge();
        self.logout(user).await;
        if let Some(bridge) = bridge
            && let Err(e) = bridge.logout().await
        {
            warn!(error = %e, "backend logout failed");
        }

        let reason = reason.unwrap_or_else(|| "Client quit".to_string());
        user.send(Message::from(Command::ERROR(format!(
            "Closing link: {} ({reason})",
            user.host()
        ))))
        .await;
        user.close();
        self.set_local_user(None);
        info!(nick = %user.nick(), reason = %reason, "client quit");
    }

    /// Log `user` in to a backend, reporting progress from the service user.
    pub async fn login(self: &Arc<Self>, user: &Arc<User>, service: Service, args: &[String]) {
        let Some(service_user) = self.service_user(service) else {
            return;
        };

        let Some(_claim) = user.begin_login() else {
            user.privmsg_from(&service_user, "you are already logged in, LOGOUT first")
                .await;
            return;
        };

        let credentials =
            match Credentials::for_service(service, args, &self.shared.config.mattermost) {
                Ok(credentials) => credentials,
                Err(e) => {
                    user.privmsg_from(&service_user, &format!("login failed: {e}"))
                        .await;
                    return;
                }
            };

        let (events_tx, events_rx) = mpsc::channel(BRIDGE_EVENT_QUEUE);
        let ctx = BridgeContext {
            events: events_tx,
            echoes: self.echoes.clone(),
            ghosts: self.shared.ghosts.clone(),
        };

        info!(nick = %user.nick(), service = %service, "backend login");
        let bridge = match self.shared.connector.connect(credentials, ctx).await {
            Ok(bridge) => bridge,
            Err(e) => {
                warn!(nick = %user.nick(), error = %e, "backend login failed");
                user.privmsg_from(&service_user, &format!("login failed: {e}"))
                    .await;
                return;
            }
        };

        if !self.attach_bridge(user, &bridge) {
            info!(nick = %user.nick(), service = %service, "client left during login");
            if let Err(e) = bridge.logout().await {
                warn!(error = %e, "backend logout failed");
            }
            return;
        }
        let me = bridge.get_me();
        user.set_backend_identity(&me);
        let backend_nick = if is_valid_nick(&me.nick) {
            me.nick.clone()
        } else {
            sanitize_nick(&me.nick)
        };
        if !me.nick.is_empty()
            && !irc_eq(&backend_nick, &user.nick())
            && let Err(e) = self.rename_user(user, &backend_nick).await
        {
            debug!(nick = %backend_nick, error = %e, "keeping IRC nick after login");
        }

        tokio::spawn(
            crate::relay::run(self.clone(), user.clone(), Arc::downgrade(&bridge), events_rx)
                .instrument(spans::bridge(service.name(), &user.nick())),
        );

        self.sync_channels(user, bridge.as_ref()).await;
        user.privmsg_from(&service_user, &format!("login OK as {}", me.nick))
            .await;
    }

    /// Attach `bridge` to `user` if it is still registered and connected.
    ///
    /// Runs under the directory lock so it cannot interleave with the
    /// registry removal in [`Server::quit`].
    fn attach_bridge(&self, user: &Arc<User>, bridge: &Arc<dyn Bridge>) -> bool {
        let dir = self.directory.write();
        let registered = dir
            .users
            .get(&irc_to_lower(&user.nick()))
            .is_some_and(|u| Arc::ptr_eq(u, user));
        if !registered || !user.is_connected() {
            return false;
        }
        user.set_bridge(bridge.clone());
        true
    }

    /// Join the local user to every backend channel the account is in.
    async fn sync_channels(&self, user: &Arc<User>, bridge: &dyn Bridge) {
        let channels = match bridge.get_channels().await {
            Ok(channels) => channels,
            Err(e) => {
                warn!(error = %e, "could not list backend channels");
                return;
            }
        };
        for info in channels.into_iter().filter(|c| !c.direct) {
            self.join_bridged(user, bridge, &info.id).await;
        }
    }

    /// Join `user` to a backend channel after materializing its current
    /// members as ghosts, so the names burst is complete.
    pub async fn join_bridged(
        &self,
        user: &Arc<User>,
        bridge: &dyn Bridge,
        channel_id: &str,
    ) -> Arc<Channel> {
        let ch = self.channel(channel_id).await;
        let me = user.backend_id();
        match bridge.get_channel_users(channel_id).await {
            Ok(members) => {
                for member in members.iter().filter(|m| m.id != me) {
                    ch.add_member(&self.ghost(member));
                }
            }
            Err(e) => debug!(channel = %channel_id, error = %e, "no member list"),
        }
        ch.join(user).await;
        ch
    }

    /// Welcome burst: 001-004, LUSERS and MOTD.
    pub async fn welcome(&self, user: &User) {
        let nick = user.nick();
        let replies = [
            (
                Response::RPL_WELCOME,
                vec![format!("Welcome! {}", user.prefix())],
            ),
            (
                Response::RPL_YOURHOST,
                vec![format!(
                    "Your host is {}, running version {}",
                    self.name(),
                    self.version()
                )],
            ),
            (
                Response::RPL_CREATED,
                vec![format!(
                    "This server was created {}",
                    self.shared.created.format("%Y-%m-%d %H:%M:%S UTC")
                )],
            ),
            (
                Response::RPL_MYINFO,
                vec![
                    self.name().to_string(),
                    self.version().to_string(),
                    "i".to_string(),
                    "np".to_string(),
                ],
            ),
        ];
        for (response, params) in replies {
            self.send_numeric(user, response, params).await;
        }
        debug!(nick = %nick, "sent welcome burst");
        self.send_lusers(user).await;
        self.send_motd(user).await;
    }

    pub async fn send_lusers(&self, user: &User) {
        self.send_numeric(
            user,
            Response::RPL_LUSERCLIENT,
            vec![format!(
                "There are {} users and 0 services on 1 servers",
                self.user_count()
            )],
        )
        .await;
    }

    pub async fn send_motd(&self, user: &User) {
        let motd = self.motd();
        if motd.is_empty() {
            self.send_numeric(user, Response::ERR_NOMOTD, vec!["MOTD File is missing".into()])
                .await;
            return;
        }
        self.send_numeric(
            user,
            Response::RPL_MOTDSTART,
            vec![format!("- {} Message of the day - ", self.name())],
        )
        .await;
        for line in motd {
            self.send_numeric(user, Response::RPL_MOTD, vec![format!("- {line}")])
                .await;
        }
        self.send_numeric(user, Response::RPL_ENDOFMOTD, vec!["End of /MOTD command".into()])
            .await;
    }
}

/// IRC name for a backend channel name.
pub fn irc_channel_name(name: &str) -> String {
    if name.starts_with('#') || name.starts_with('&') {
        name.to_string()
    } else {
        format!("#{name}")
    }
}
