//! Backend bridge capability.
//!
//! A [`Bridge`] is one logged-in backend account (Slack or Mattermost). The
//! registry drives it for outbound actions; the backend's event stream is
//! translated into [`BridgeEvent`]s and delivered in order through the
//! queue carried by [`BridgeContext`].

pub mod event;
pub mod mattermost;
pub mod slack;
pub mod text;

#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::{MattermostConfig, SlackConfig};
use crate::error::BridgeError;
use crate::state::{GhostCache, PendingEchoes};

pub use event::BridgeEvent;

/// Capacity of the per-login bridge event queue.
pub const BRIDGE_EVENT_QUEUE: usize = 256;

/// Backend flavour, chosen explicitly at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Slack,
    Mattermost,
}

impl Service {
    /// Nick of the service user and value reported by `protocol()`.
    pub fn name(self) -> &'static str {
        match self {
            Service::Slack => "slack",
            Service::Mattermost => "mattermost",
        }
    }

    pub fn all() -> [Service; 2] {
        [Service::Slack, Service::Mattermost]
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Login credentials for one backend account.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Slack {
        token: String,
    },
    Mattermost {
        server: String,
        team: String,
        login: String,
        pass: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Slack { .. } => f.debug_struct("Slack").finish_non_exhaustive(),
            Credentials::Mattermost {
                server,
                team,
                login,
                ..
            } => f
                .debug_struct("Mattermost")
                .field("server", server)
                .field("team", team)
                .field("login", login)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    /// Interpret PASS arguments, selecting the backend from their count.
    ///
    /// One argument is a Slack token. Anything else is Mattermost:
    /// `login pass`, `team login pass` or `server team login pass`, with the
    /// missing parts taken from the configured defaults.
    pub fn from_args(args: &[String], defaults: &MattermostConfig) -> Result<Self, BridgeError> {
        let service = if args.len() == 1 {
            Service::Slack
        } else {
            Service::Mattermost
        };
        Self::for_service(service, args, defaults)
    }

    /// Interpret `LOGIN` arguments addressed to a specific service user.
    pub fn for_service(
        service: Service,
        args: &[String],
        defaults: &MattermostConfig,
    ) -> Result<Self, BridgeError> {
        if service == Service::Slack {
            return match args {
                [token] => Ok(Credentials::Slack {
                    token: token.clone(),
                }),
                _ => Err(BridgeError::Credentials("slack login takes one token".into())),
            };
        }

        let (server, team, login, pass) = match args {
            [login, pass] => (
                defaults.default_server.clone(),
                defaults.default_team.clone(),
                login,
                pass,
            ),
            [team, login, pass] => (defaults.default_server.clone(), team.clone(), login, pass),
            [server, team, login, pass] => (server.clone(), team.clone(), login, pass),
            _ => {
                return Err(BridgeError::Credentials(format!(
                    "mattermost login takes 2 to 4 arguments, got {}",
                    args.len()
                )));
            }
        };
        if server.is_empty() || team.is_empty() {
            return Err(BridgeError::Credentials(
                "no mattermost server or team given and no default configured".into(),
            ));
        }
        Ok(Credentials::Mattermost {
            server,
            team,
            login: login.clone(),
            pass: pass.clone(),
        })
    }

    pub fn service(&self) -> Service {
        match self {
            Credentials::Slack { .. } => Service::Slack,
            Credentials::Mattermost { .. } => Service::Mattermost,
        }
    }
}

/// Backend-neutral identity of one backend user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    /// Backend user id.
    pub id: String,
    pub nick: String,
    pub user: String,
    pub real: String,
    pub host: String,
    pub display_name: String,
    pub team_id: String,
    /// Synthesized identity with no IRC connection of its own.
    pub ghost: bool,
    /// The logged-in account itself.
    pub me: bool,
}

/// Backend channel metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: String,
    /// Backend channel name, without the IRC `#` prefix.
    pub name: String,
    pub team_id: String,
    pub topic: String,
    pub private: bool,
    /// One-to-one conversation rather than a channel.
    pub direct: bool,
}

/// Presence reported through [`Bridge::set_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Online,
    Away,
}

/// Shared plumbing handed to a bridge when it connects.
#[derive(Clone)]
pub struct BridgeContext {
    /// Ordered queue drained by the relay.
    pub events: mpsc::Sender<BridgeEvent>,
    /// Last message id sent per channel, for echo suppression.
    pub echoes: Arc<PendingEchoes>,
    /// Process-wide backend identity cache.
    pub ghosts: Arc<GhostCache>,
}

/// One logged-in backend account.
#[async_trait]
pub trait Bridge: Send + Sync {
    fn protocol(&self) -> Service;
    fn connected(&self) -> bool;
    /// Identity of the logged-in account.
    fn get_me(&self) -> UserInfo;

    /// Stop streaming. A final [`BridgeEvent::Logout`] is queued for the
    /// relay when there is room.
    async fn logout(&self) -> Result<(), BridgeError>;

    /// Channels the account is a member of.
    async fn get_channels(&self) -> Result<Vec<ChannelInfo>, BridgeError>;
    async fn get_channel(&self, channel_id: &str) -> Result<ChannelInfo, BridgeError>;
    async fn get_channel_name(&self, channel_id: &str) -> Result<String, BridgeError>;
    async fn get_channel_id(&self, name: &str) -> Result<String, BridgeError>;
    async fn get_channel_users(&self, channel_id: &str) -> Result<Vec<UserInfo>, BridgeError>;
    async fn get_users(&self) -> Result<Vec<UserInfo>, BridgeError>;
    async fn get_user(&self, user_id: &str) -> Result<UserInfo, BridgeError>;

    /// Post to a channel; returns the backend message id.
    async fn msg_channel(&self, channel_id: &str, text: &str) -> Result<String, BridgeError>;
    /// Post a direct message; returns the backend message id.
    async fn msg_user(&self, user_id: &str, text: &str) -> Result<String, BridgeError>;

    /// Join by name; returns the joined channel's metadata.
    async fn join(&self, name: &str) -> Result<ChannelInfo, BridgeError>;
    async fn part(&self, channel_id: &str) -> Result<(), BridgeError>;
    async fn invite(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError>;
    async fn kick(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError>;
    async fn set_topic(&self, channel_id: &str, text: &str) -> Result<(), BridgeError>;
    async fn topic(&self, channel_id: &str) -> Result<String, BridgeError>;
    async fn set_status(&self, status: Status) -> Result<(), BridgeError>;
    /// Every channel visible to the account, member or not.
    async fn list(&self) -> Result<Vec<ChannelInfo>, BridgeError>;
}

/// Opens backend sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        credentials: Credentials,
        ctx: BridgeContext,
    ) -> Result<Arc<dyn Bridge>, BridgeError>;
}

/// Production connector talking to the real backends.
pub struct NetworkConnector {
    slack: SlackConfig,
    mattermost: MattermostConfig,
}

impl NetworkConnector {
    pub fn new(slack: SlackConfig, mattermost: MattermostConfig) -> Self {
        Self { slack, mattermost }
    }
}

#[async_trait]
impl Connector for NetworkConnector {
    async fn connect(
        &self,
        credentials: Credentials,
        ctx: BridgeContext,
    ) -> Result<Arc<dyn Bridge>, BridgeError> {
        match credentials {
            Credentials::Slack { token } => {
                let api = Arc::new(slack::SlackClient::new(token)?);
                let bridge = slack::SlackBridge::connect(api, &self.slack, ctx).await?;
                Ok(bridge)
            }
            Credentials::Mattermost {
                server,
                team,
                login,
                pass,
            } => {
                let api = Arc::new(
                    mattermost::MattermostClient::login(
                        &server,
                        &login,
                        &pass,
                        self.mattermost.insecure,
                    )
                    .await?,
                );
                let bridge = mattermost::MattermostBridge::connect(api, &team, ctx).await?;
                Ok(bridge)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn defaults() -> MattermostConfig {
        MattermostConfig {
            default_server: "chat.example.com".into(),
            default_team: "eng".into(),
            insecure: false,
        }
    }

    #[test]
    fn test_single_pass_argument_selects_slack() {
        let creds = Credentials::from_args(&args(&["xoxp-123"]), &defaults()).unwrap();
        assert_eq!(creds.service(), Service::Slack);
    }

    #[test]
    fn test_mattermost_argument_shapes() {
        let creds = Credentials::from_args(&args(&["alice", "pw"]), &defaults()).unwrap();
        assert_eq!(
            creds,
            Credentials::Mattermost {
                server: "chat.example.com".into(),
                team: "eng".into(),
                login: "alice".into(),
                pass: "pw".into(),
            }
        );

        let creds = Credentials::from_args(&args(&["ops", "alice", "pw"]), &defaults()).unwrap();
        assert!(matches!(creds, Credentials::Mattermost { ref team, .. } if team == "ops"));

        let creds =
            Credentials::from_args(&args(&["mm.local", "ops", "alice", "pw"]), &defaults())
                .unwrap();
        assert!(matches!(creds, Credentials::Mattermost { ref server, .. } if server == "mm.local"));
    }

    #[test]
    fn test_mattermost_without_defaults_is_rejected() {
        let err = Credentials::from_args(&args(&["alice", "pw"]), &MattermostConfig::default());
        assert!(matches!(err, Err(BridgeError::Credentials(_))));
        let err = Credentials::from_args(&args(&["a", "b", "c", "d", "e"]), &defaults());
        assert!(matches!(err, Err(BridgeError::Credentials(_))));
        let err = Credentials::from_args(&[], &defaults());
        assert!(matches!(err, Err(BridgeError::Credentials(_))));
    }

    #[test]
    fn test_login_arguments_must_fit_the_service() {
        let err = Credentials::for_service(Service::Slack, &args(&["a", "b"]), &defaults());
        assert!(matches!(err, Err(BridgeError::Credentials(_))));
        let err = Credentials::for_service(Service::Mattermost, &args(&["tok"]), &defaults());
        assert!(matches!(err, Err(BridgeError::Credentials(_))));
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = Credentials::Slack {
            token: "xoxp-secret".into(),
        };
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
