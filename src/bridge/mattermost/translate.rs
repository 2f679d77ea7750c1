//! Mattermost websocket events to [`BridgeEvent`]s.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::api::{MattermostApi, MmPost, MmReaction, WsEvent};
use super::users::MattermostUsers;
use crate::bridge::text::{self, FileUpload, MessageParts};
use crate::bridge::{BridgeEvent, UserInfo};
use crate::error::BridgeError;
use crate::state::{EchoIds, PendingEchoes};

/// How a post event changes what the channel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostChange {
    New,
    Edited,
    Deleted,
}

pub struct MattermostTranslator {
    api: Arc<dyn MattermostApi>,
    users: Arc<MattermostUsers>,
    echoes: Arc<PendingEchoes>,
}

impl MattermostTranslator {
    pub fn new(
        api: Arc<dyn MattermostApi>,
        users: Arc<MattermostUsers>,
        echoes: Arc<PendingEchoes>,
    ) -> Self {
        Self { api, users, echoes }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<WsEvent>, events: mpsc::Sender<BridgeEvent>) {
        while let Some(event) = rx.recv().await {
            for out in self.translate(event).await {
                if events.send(out).await.is_err() {
                    debug!("bridge event queue closed, stopping mattermost translator");
                    return;
                }
            }
        }
        debug!("mattermost event stream drained");
    }

    /// Translate one websocket event. Events that cannot be resolved yield
    /// nothing.
    pub async fn translate(&self, event: WsEvent) -> Vec<BridgeEvent> {
        let result = match event.event.as_str() {
            "posted" => self.post(&event, PostChange::New).await,
            "post_edited" => self.post(&event, PostChange::Edited).await,
            "post_deleted" => self.post(&event, PostChange::Deleted).await,
            "user_added" => self.user_added(&event).await,
            "user_removed" => self.user_removed(&event).await,
            "reaction_added" => self.reaction(&event, "Added").await,
            "reaction_removed" => self.reaction(&event, "Removed").await,
            "disconnected" => {
                debug!("mattermost websocket disconnected");
                Ok(Vec::new())
            }
            other => {
                trace!(event = %other, "ignored mattermost event");
                Ok(Vec::new())
            }
        };

        result.unwrap_or_else(|e| {
            warn!(event = %event.event, error = %e, "dropping mattermost event");
            Vec::new()
        })
    }

    async fn post(
        &self,
        event: &WsEvent,
        change: PostChange,
    ) -> Result<Vec<BridgeEvent>, BridgeError> {
        let post: MmPost = event.embedded("post")?;

        if post.kind == "system_header_change" {
            if change != PostChange::New {
                return Ok(Vec::new());
            }
            let sender = self.users.get(&post.user_id).await?;
            return Ok(vec![BridgeEvent::ChannelTopic {
                channel_id: post.channel_id.clone(),
                sender,
                text: post.new_header().to_string(),
            }]);
        }
        if post.kind.starts_with("system_") {
            return Ok(Vec::new());
        }

        if change == PostChange::New
            && post.user_id == self.users.me_id()
            && self
                .echoes
                .suppress(&post.channel_id, &post.id, EchoIds::Opaque)
                .await
        {
            trace!(channel = %post.channel_id, post = %post.id, "suppressed own echo");
            return Ok(Vec::new());
        }

        let sender = self.users.get(&post.user_id).await?;
        let lines = match change {
            PostChange::Deleted => vec![text::deleted_line(&post.create_at.to_string())],
            PostChange::New | PostChange::Edited => self.render(&post, change).await,
        };
        self.route(&post.channel_id, event.str("channel_type"), sender, lines)
            .await
    }

    async fn render(&self, post: &MmPost, change: PostChange) -> Vec<String> {
        let files: Vec<FileUpload> = post
            .metadata
            .files
            .iter()
            .map(|f| FileUpload {
                mode: "hosted".into(),
                name: f.name.clone(),
                title: f.name.clone(),
                filetype: f.extension.clone(),
                url: self.api.file_url(&f.id),
            })
            .collect();

        let thread_ts = if post.root_id.is_empty() {
            None
        } else {
            match self.api.post(&post.root_id).await {
                Ok(Some(root)) => Some(root.create_at.to_string()),
                Ok(None) => None,
                Err(e) => {
                    debug!(root = %post.root_id, error = %e, "thread root lookup failed");
                    None
                }
            }
        };
        let edited_ts = (change == PostChange::Edited).then(|| post.create_at.to_string());

        text::render(&MessageParts {
            body: &post.message,
            attachments: &[],
            files: &files,
            thread_ts: thread_ts.as_deref(),
            edited_ts: edited_ts.as_deref(),
        })
    }

    async fn user_added(&self, event: &WsEvent) -> Result<Vec<BridgeEvent>, BridgeError> {
        let added = self.users.get(event.str("user_id")).await?;
        Ok(vec![BridgeEvent::ChannelAdd {
            channel_id: event.broadcast.channel_id.clone(),
            added: vec![added],
            adder: None,
        }])
    }

    async fn user_removed(&self, event: &WsEvent) -> Result<Vec<BridgeEvent>, BridgeError> {
        // removals of the account itself are addressed to it, not the channel
        let (user_id, channel_id) = if event.broadcast.channel_id.is_empty() {
            (event.broadcast.user_id.as_str(), event.str("channel_id"))
        } else {
            (event.str("user_id"), event.broadcast.channel_id.as_str())
        };
        let removed = self.users.get(user_id).await?;
        Ok(vec![BridgeEvent::ChannelRemove {
            channel_id: channel_id.to_string(),
            removed: vec![removed],
        }])
    }

    async fn reaction(&self, event: &WsEvent, verb: &str) -> Result<Vec<BridgeEvent>, BridgeError> {
        let reaction: MmReaction = event.embedded("reaction")?;
        let Some(target) = self.api.post(&reaction.post_id).await? else {
            debug!(post = %reaction.post_id, "reaction target not found");
            return Ok(Vec::new());
        };
        let sender = self.users.get(&reaction.user_id).await?;
        let line = format!(
            "{} {verb} reaction :{}:",
            text::message_marker(&target.create_at.to_string()),
            reaction.emoji_name
        );
        self.route(&target.channel_id, "", sender, vec![line]).await
    }

    async fn route(
        &self,
        channel_id: &str,
        channel_type: &str,
        sender: UserInfo,
        lines: Vec<String>,
    ) -> Result<Vec<BridgeEvent>, BridgeError> {
        let direct = match channel_type {
            "" => {
                let channel = self.api.channel(channel_id).await?;
                channel.is_direct().then_some(channel)
            }
            "D" => Some(self.api.channel(channel_id).await?),
            _ => None,
        };

        let Some(channel) = direct else {
            return Ok(lines
                .into_iter()
                .map(|text| BridgeEvent::ChannelMessage {
                    channel_id: channel_id.to_string(),
                    sender: sender.clone(),
                    text,
                })
                .collect());
        };

        let receiver_id = if sender.me {
            channel
                .direct_partner(self.users.me_id())
                .ok_or_else(|| BridgeError::NotFound(format!("partner in {channel_id}")))?
        } else {
            self.users.me_id().to_string()
        };
        let receiver = self.users.get(&receiver_id).await?;
        Ok(lines
            .into_iter()
            .map(|text| BridgeEvent::DirectMessage {
                sender: sender.clone(),
                receiver: receiver.clone(),
                text,
            })
            .collect())
    }
}
