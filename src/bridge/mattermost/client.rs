//! Mattermost REST v4 over HTTP(S).

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, trace};

use super::api::{MattermostApi, MmChannel, MmChannelMember, MmPost, MmTeam, MmUser};
use crate::error::BridgeError;

const PER_PAGE: usize = 200;

pub struct MattermostClient {
    http: reqwest::Client,
    /// `https://host` or `http://host`.
    base_url: String,
    token: String,
}

impl MattermostClient {
    /// Log in with a password and keep the session token.
    pub async fn login(
        server: &str,
        login: &str,
        pass: &str,
        insecure: bool,
    ) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let base_url = base_url(server, insecure);

        let response = http
            .post(format!("{base_url}/api/v4/users/login"))
            .json(&json!({ "login_id": login, "password": pass }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or_default();
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("login rejected");
            return Err(BridgeError::Credentials(format!("{status}: {message}")));
        }
        let token = response
            .headers()
            .get("Token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| BridgeError::Api("login reply carries no token".into()))?;
        debug!(server = %base_url, login, "mattermost session opened");

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        trace!(%method, path, "mattermost api call");
        self.http
            .request(method, format!("{}/api/v4{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BridgeError> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BridgeError::NotFound(response.url().path().to_string()));
        }
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Err(BridgeError::Api(format!("{status}: {message}")));
        }
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BridgeError> {
        self.send(self.request(Method::GET, path)).await
    }

    /// Fetch `?page=n` until a short page comes back.
    async fn pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, BridgeError> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        for page in 0.. {
            let batch: Vec<T> = self
                .get(&format!("{path}{sep}page={page}&per_page={PER_PAGE}"))
                .await?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }
}

/// Normalize a server setting into a base URL.
fn base_url(server: &str, insecure: bool) -> String {
    let server = server.trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        return server.to_string();
    }
    let scheme = if insecure { "http" } else { "https" };
    format!("{scheme}://{server}")
}

#[async_trait]
impl MattermostApi for MattermostClient {
    async fn me(&self) -> Result<MmUser, BridgeError> {
        self.get("/users/me").await
    }

    async fn team_by_name(&self, name: &str) -> Result<MmTeam, BridgeError> {
        self.get(&format!("/teams/name/{name}")).await
    }

    async fn user(&self, user_id: &str) -> Result<MmUser, BridgeError> {
        self.get(&format!("/users/{user_id}")).await
    }

    async fn team_users(&self, team_id: &str) -> Result<Vec<MmUser>, BridgeError> {
        self.pages(&format!("/users?in_team={team_id}")).await
    }

    async fn my_channels(&self, team_id: &str) -> Result<Vec<MmChannel>, BridgeError> {
        self.get(&format!("/users/me/teams/{team_id}/channels")).await
    }

    async fn team_channels(&self, team_id: &str) -> Result<Vec<MmChannel>, BridgeError> {
        self.pages(&format!("/teams/{team_id}/channels")).await
    }

    async fn channel(&self, channel_id: &str) -> Result<MmChannel, BridgeError> {
        self.get(&format!("/channels/{channel_id}")).await
    }

    async fn channel_by_name(&self, team_id: &str, name: &str) -> Result<MmChannel, BridgeError> {
        self.get(&format!("/teams/{team_id}/channels/name/{name}"))
            .await
    }

    async fn channel_members(&self, channel_id: &str) -> Result<Vec<String>, BridgeError> {
        let members: Vec<MmChannelMember> =
            self.pages(&format!("/channels/{channel_id}/members")).await?;
        Ok(members.into_iter().map(|m| m.user_id).collect())
    }

    async fn add_member(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        let _: Value = self
            .send(
                self.request(Method::POST, &format!("/channels/{channel_id}/members"))
                    .json(&json!({ "user_id": user_id })),
            )
            .await?;
        Ok(())
    }

    async fn remove_member(&self, channel_id: &str, user_id: &str) -> Result<(), BridgeError> {
        let _: Value = self
            .send(self.request(
                Method::DELETE,
                &format!("/channels/{channel_id}/members/{user_id}"),
            ))
            .await?;
        Ok(())
    }

    async fn patch_header(&self, channel_id: &str, header: &str) -> Result<(), BridgeError> {
        let _: Value = self
            .send(
                self.request(Method::PUT, &format!("/channels/{channel_id}/patch"))
                    .json(&json!({ "header": header })),
            )
            .await?;
        Ok(())
    }

    async fn create_post(&self, channel_id: &str, message: &str) -> Result<MmPost, BridgeError> {
        self.send(
            self.request(Method::POST, "/posts")
                .json(&json!({ "channel_id": channel_id, "message": message })),
        )
        .await
    }

    async fn direct_channel(&self, user_a: &str, user_b: &str) -> Result<MmChannel, BridgeError> {
        self.send(
            self.request(Method::POST, "/channels/direct")
                .json(&json!([user_a, user_b])),
        )
        .await
    }

    async fn set_status(&self, user_id: &str, status: &str) -> Result<(), BridgeError> {
        let _: Value = self
            .send(
                self.request(Method::PUT, &format!("/users/{user_id}/status"))
                    .json(&json!({ "user_id": user_id, "status": status })),
            )
            .await?;
        Ok(())
    }

    async fn post(&self, post_id: &str) -> Result<Option<MmPost>, BridgeError> {
        match self.get(&format!("/posts/{post_id}")).await {
            Ok(post) => Ok(Some(post)),
            Err(BridgeError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/api/v4/files/{file_id}", self.base_url)
    }

    fn websocket_url(&self) -> String {
        let ws = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{ws}/api/v4/websocket")
    }

    fn token(&self) -> String {
        self.token.clone()
    }
}
