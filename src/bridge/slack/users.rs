//! Slack account lookup through the shared ghost cache.

use std::sync::Arc;
use tracing::{debug, warn};

use super::api::{SlackApi, SlackUser};
use crate::bridge::UserInfo;
use crate::error::BridgeError;
use crate::state::GhostCache;
use crate::state::casemap::{is_valid_nick, sanitize_nick};

/// Slack's own system account, author of deletion notices.
pub const SLACKBOT_ID: &str = "USLACKBOT";

/// Resolves Slack user and bot ids to bridge identities for one login.
pub struct SlackUsers {
    api: Arc<dyn SlackApi>,
    ghosts: Arc<GhostCache>,
    team_id: String,
    domain: String,
    me_id: String,
    prefer_nickname: bool,
}

impl SlackUsers {
    pub fn new(
        api: Arc<dyn SlackApi>,
        ghosts: Arc<GhostCache>,
        team_id: &str,
        domain: &str,
        me_id: &str,
        prefer_nickname: bool,
    ) -> Self {
        Self {
            api,
            ghosts,
            team_id: team_id.to_string(),
            domain: domain.to_string(),
            me_id: me_id.to_string(),
            prefer_nickname,
        }
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    pub fn me_id(&self) -> &str {
        &self.me_id
    }

    /// Bridge identity of a Slack account.
    pub fn convert(&self, user: &SlackUser) -> UserInfo {
        let display = user.profile.display_name.as_str();
        let nick = if self.prefer_nickname && is_valid_nick(display) {
            display.to_string()
        } else {
            sanitize_nick(&user.name)
        };
        let real = if user.real_name.is_empty() {
            user.profile.real_name.clone()
        } else {
            user.real_name.clone()
        };
        UserInfo {
            id: user.id.clone(),
            nick,
            user: user.id.clone(),
            real,
            host: self.domain.clone(),
            display_name: display.to_string(),
            team_id: self.team_id.clone(),
            ghost: user.id != self.me_id,
            me: user.id == self.me_id,
        }
    }

    /// Fill the ghost cache with every account of the team.
    pub async fn preload(&self) -> Result<usize, BridgeError> {
        let users = self.api.users_list().await?;
        let count = users.len();
        for user in users.iter().filter(|u| !u.deleted) {
            self.ghosts.insert(self.convert(user));
        }
        debug!(team = %self.team_id, count, "slack users loaded");
        Ok(count)
    }

    /// Identity for a user id, from the cache or the API.
    pub async fn get(&self, user_id: &str) -> Result<UserInfo, BridgeError> {
        if user_id == SLACKBOT_ID {
            return Ok(self.slackbot());
        }
        if let Some(info) = self.ghosts.get(&self.team_id, user_id) {
            return Ok(self.relative(info));
        }
        let user = self.api.user_info(user_id).await?;
        let info = self.convert(&user);
        self.ghosts.insert(info.clone());
        Ok(info)
    }

    pub async fn all(&self) -> Result<Vec<UserInfo>, BridgeError> {
        let users = self.api.users_list().await?;
        Ok(users
            .iter()
            .filter(|u| !u.deleted)
            .map(|u| {
                let info = self.convert(u);
                self.ghosts.insert(info.clone());
                info
            })
            .collect())
    }

    /// Identity for a bot-authored message.
    ///
    /// Uses the message's `username` when present, then `bots.info`, then a
    /// generic `bot` nick. One bot posting under several usernames gets one
    /// identity per username.
    pub async fn bot(&self, bot_id: &str, username: &str) -> UserInfo {
        let key = if username.is_empty() {
            format!("B:{bot_id}")
        } else {
            format!("B:{bot_id}:{username}")
        };
        if let Some(info) = self.ghosts.get(&self.team_id, &key) {
            return info;
        }

        let name = if !username.is_empty() {
            username.to_string()
        } else {
            match self.api.bot_info(bot_id).await {
                Ok(bot) if !bot.name.is_empty() => bot.name,
                Ok(_) => "bot".to_string(),
                Err(e) => {
                    warn!(bot = %bot_id, error = %e, "bot lookup failed");
                    "bot".to_string()
                }
            }
        };
        let info = UserInfo {
            id: key,
            nick: sanitize_nick(&name),
            user: bot_id.to_string(),
            real: name.clone(),
            host: self.domain.clone(),
            display_name: name,
            team_id: self.team_id.clone(),
            ghost: true,
            me: false,
        };
        self.ghosts.insert(info.clone());
        info
    }

    /// Identity for whoever authored a message.
    pub async fn sender(
        &self,
        user_id: &str,
        bot_id: &str,
        username: &str,
    ) -> Result<UserInfo, BridgeError> {
        if !user_id.is_empty() {
            return self.get(user_id).await;
        }
        if !bot_id.is_empty() {
            return Ok(self.bot(bot_id, username).await);
        }
        Ok(self.slackbot())
    }

    pub fn slackbot(&self) -> UserInfo {
        UserInfo {
            id: SLACKBOT_ID.to_string(),
            nick: "slackbot".to_string(),
            user: SLACKBOT_ID.to_string(),
            real: "slackbot".to_string(),
            host: self.domain.clone(),
            display_name: "slackbot".to_string(),
            team_id: self.team_id.clone(),
            ghost: true,
            me: false,
        }
    }

    /// Cached identities carry no `me`; restore it for this login.
    fn relative(&self, info: UserInfo) -> UserInfo {
        let me = info.id == self.me_id;
        UserInfo {
            me,
            ghost: !me,
            ..info
        }
    }
}
