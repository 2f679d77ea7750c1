//! Commands addressed to a service user (`/msg slack LOGIN ...`).

use std::sync::Arc;
use tracing::{debug, warn};

use super::Context;
use crate::bridge::Service;
use crate::state::User;

fn help(service: Service) -> [&'static str; 4] {
    let login = match service {
        Service::Slack => "LOGIN <token>  log in to slack",
        Service::Mattermost => {
            "LOGIN [[<server>] <team>] <login> <password>  log in to mattermost"
        }
    };
    [
        "commands:",
        login,
        "LOGOUT  end the backend session, stay connected",
        "HELP  this text",
    ]
}

/// Run one service command. Replies come back as PRIVMSG from the service
/// user.
pub(super) async fn command(ctx: &Context, service: Service, service_user: &Arc<User>, text: &str) {
    let mut words = text.split_whitespace();
    let verb = words.next().unwrap_or("HELP").to_ascii_uppercase();
    let args: Vec<String> = words.map(str::to_string).collect();
    debug!(service = %service, command = %verb, "service command");

    match verb.as_str() {
        "LOGIN" => ctx.server.login(&ctx.user, service, &args).await,
        "LOGOUT" => logout(ctx, service_user).await,
        "HELP" => {
            for line in help(service) {
                ctx.user.privmsg_from(service_user, line).await;
            }
        }
        other => {
            ctx.user
                .privmsg_from(service_user, &format!("unknown command {other}, try HELP"))
                .await;
        }
    }
}

async fn logout(ctx: &Context, service_user: &User) {
    let Some(bridge) = ctx.user.bridge() else {
        ctx.user
            .privmsg_from(service_user, "you are not logged in")
            .await;
        return;
    };
    ctx.server.logout(&ctx.user).await;
    if let Err(e) = bridge.logout().await {
        warn!(error = %e, "backend logout failed");
    }
    ctx.user.privmsg_from(service_user, "logged out").await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::{FakeBridge, FakeConnector};
    use crate::bridge::Credentials;
    use crate::handlers::testing::{drain, setup, setup_with};
    use irc_proto::{Command, Message};
    use tokio::sync::mpsc;

    fn texts(rx: &mut mpsc::Receiver<Message>) -> Vec<String> {
        drain(rx)
            .into_iter()
            .filter_map(|m| match m.command {
                Command::PRIVMSG(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let bridge = Arc::new(FakeBridge::new("U1", "alice"));
        let connector = Arc::new(FakeConnector::with_bridge(bridge.clone()));
        let (ctx, mut rx) = setup_with(connector.clone());
        let slack = ctx.server.service_user(Service::Slack).unwrap();

        command(&ctx, Service::Slack, &slack, "login xoxp-1").await;
        assert_eq!(
            connector.attempts(),
            vec![Credentials::Slack {
                token: "xoxp-1".into()
            }]
        );
        assert!(ctx.user.bridge().is_some());
        assert_eq!(ctx.user.backend_id(), "U1");
        assert_eq!(texts(&mut rx).last().unwrap(), "login OK as alice");

        command(&ctx, Service::Slack, &slack, "LOGOUT").await;
        assert!(ctx.user.bridge().is_none());
        assert!(bridge.logged_out());
        assert_eq!(texts(&mut rx), vec!["logged out"]);
    }

    #[tokio::test]
    async fn test_login_failure_is_reported() {
        let (ctx, mut rx) = setup();
        let mm = ctx.server.service_user(Service::Mattermost).unwrap();
        command(&ctx, Service::Mattermost, &mm, "LOGIN onlyone").await;
        let out = texts(&mut rx);
        assert!(out[0].starts_with("login failed:"));
        assert!(ctx.user.bridge().is_none());
    }

    #[tokio::test]
    async fn test_help_and_unknown() {
        let (ctx, mut rx) = setup();
        let slack = ctx.server.service_user(Service::Slack).unwrap();
        command(&ctx, Service::Slack, &slack, "").await;
        let out = texts(&mut rx);
        assert_eq!(out.len(), 4);
        assert!(out[1].starts_with("LOGIN <token>"));

        command(&ctx, Service::Slack, &slack, "dance now").await;
        assert_eq!(texts(&mut rx), vec!["unknown command DANCE, try HELP"]);
    }
}
