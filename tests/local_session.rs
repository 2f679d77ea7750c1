//! Integration tests for a session that is not logged in to any backend.
//!
//! Channels are local, and the service users answer commands.

mod common;

use common::TestServer;
use common::client::numeric;
use irc_proto::{Command, Response};

#[tokio::test]
async fn test_join_local_channel() {
    let server = TestServer::spawn().await.expect("spawn bridge");
    let mut client = server.connect("alice").await.expect("connect");
    client.register().await.expect("registration");

    client.send_raw("JOIN #scratch").await.unwrap();
    let msgs = client
        .recv_until(|m| numeric(m) == Some(Response::RPL_ENDOFNAMES))
        .await
        .expect("join burst");
    assert!(matches!(msgs[0].command, Command::JOIN(ref ch, _, _) if ch == "#scratch"));
    assert!(msgs.iter().any(|m| matches!(
        m.command,
        Command::Response(Response::RPL_NAMREPLY, ref args) if args.last().is_some_and(|n| n.contains("alice"))
    )));

    client.send_raw("LIST").await.unwrap();
    let list = client
        .recv_until(|m| numeric(m) == Some(Response::RPL_LISTEND))
        .await
        .expect("LIST");
    assert!(list.iter().any(|m| matches!(
        m.command,
        Command::Response(Response::RPL_LIST, ref args) if args[1] == "#scratch"
    )));
}

#[tokio::test]
async fn test_join_rejects_bad_name() {
    let server = TestServer::spawn().await.expect("spawn bridge");
    let mut client = server.connect("alice").await.expect("connect");
    client.register().await.expect("registration");

    client.send_raw("JOIN nohash").await.unwrap();
    let reply = client.recv().await.unwrap();
    assert_eq!(numeric(&reply), Some(Response::ERR_NOSUCHCHANNEL));
}

#[tokio::test]
async fn test_service_help() {
    let server = TestServer::spawn().await.expect("spawn bridge");
    let mut client = server.connect("alice").await.expect("connect");
    client.register().await.expect("registration");

    client.send_raw("PRIVMSG slack :HELP me").await.unwrap();
    let first = client.recv().await.expect("help text");
    match first.command {
        Command::PRIVMSG(ref target, ref text) => {
            assert_eq!(target, "alice");
            assert_eq!(text, "commands:");
        }
        other => panic!("expected PRIVMSG, got {other:?}"),
    }
    assert!(matches!(
        first.prefix,
        Some(irc_proto::Prefix::Nickname(ref nick, _, _)) if nick == "slack"
    ));
}

#[tokio::test]
async fn test_logout_without_login() {
    let server = TestServer::spawn().await.expect("spawn bridge");
    let mut client = server.connect("alice").await.expect("connect");
    client.register().await.expect("registration");

    client.send_raw("PRIVMSG mattermost :LOGOUT now").await.unwrap();
    let reply = client.recv().await.unwrap();
    assert!(matches!(
        reply.command,
        Command::PRIVMSG(_, ref text) if text == "you are not logged in"
    ));
}

#[tokio::test]
async fn test_whois_service_user() {
    let server = TestServer::spawn().await.expect("spawn bridge");
    let mut client = server.connect("alice").await.expect("connect");
    client.register().await.expect("registration");

    client.send_raw("WHOIS slack").await.unwrap();
    let msgs = client
        .recv_until(|m| numeric(m) == Some(Response::RPL_ENDOFWHOIS))
        .await
        .expect("WHOIS");
    assert!(msgs.iter().any(|m| matches!(
        m.command,
        Command::Response(Response::RPL_WHOISSERVER, ref args) if args.last().is_some_and(|s| s.contains("login service"))
    )));
}

#[tokio::test]
async fn test_nick_change_after_registration() {
    let server = TestServer::spawn().await.expect("spawn bridge");
    let mut client = server.connect("alice").await.expect("connect");
    client.register().await.expect("registration");

    client.send_raw("NICK alicia").await.unwrap();
    let reply = client.recv().await.unwrap();
    assert!(matches!(reply.command, Command::NICK(ref n) if n == "alicia"));

    client.send_raw("NICK mattermost").await.unwrap();
    let reply = client.recv().await.unwrap();
    assert_eq!(numeric(&reply), Some(Response::ERR_NICKNAMEINUSE));
}
