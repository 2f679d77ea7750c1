//! Mattermost account lookup through the shared ghost cache.

use std::sync::Arc;
use tracing::debug;

use super::api::{MattermostApi, MmUser};
use crate::bridge::UserInfo;
use crate::error::BridgeError;
use crate::state::GhostCache;
use crate::state::casemap::sanitize_nick;

pub struct MattermostUsers {
    api: Arc<dyn MattermostApi>,
    ghosts: Arc<GhostCache>,
    team_id: String,
    host: String,
    me_id: String,
}

impl MattermostUsers {
    pub fn new(
        api: Arc<dyn MattermostApi>,
        ghosts: Arc<GhostCache>,
        team_id: &str,
        host: &str,
        me_id: &str,
    ) -> Self {
        Self {
            api,
            ghosts,
            team_id: team_id.to_string(),
            host: host.to_string(),
            me_id: me_id.to_string(),
        }
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    pub fn me_id(&self) -> &str {
        &self.me_id
    }

    pub fn convert(&self, user: &MmUser) -> UserInfo {
        let me = user.id == self.me_id;
        UserInfo {
            id: user.id.clone(),
            nick: sanitize_nick(&user.username),
            user: user.id.clone(),
            real: user.full_name(),
            host: self.host.clone(),
            display_name: user.nickname.clone(),
            team_id: self.team_id.clone(),
            ghost: !me,
            me,
        }
    }

    pub async fn preload(&self) -> Result<usize, BridgeError> {
        let users = self.all().await?;
        debug!(team = %self.team_id, count = users.len(), "mattermost users loaded");
        Ok(users.len())
    }

    pub async fn all(&self) -> Result<Vec<UserInfo>, BridgeError> {
        let users = self.api.team_users(&self.team_id).await?;
        Ok(users
            .iter()
            .filter(|u| u.delete_at == 0)
            .map(|u| {
                let info = self.convert(u);
                self.ghosts.insert(info.clone());
                info
            })
            .collect())
    }

    pub async fn get(&self, user_id: &str) -> Result<UserInfo, BridgeError> {
        if let Some(info) = self.ghosts.get(&self.team_id, user_id) {
            let me = info.id == self.me_id;
            return Ok(UserInfo {
                me,
                ghost: !me,
                ..info
            });
        }
        let user = self.api.user(user_id).await?;
        let info = self.convert(&user);
        self.ghosts.insert(info.clone());
        Ok(info)
    }
}
