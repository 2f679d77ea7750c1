//! Integration tests for the registration handshake limits.

mod common;

use common::TestServer;
use common::client::numeric;
use irc_proto::Response;

#[tokio::test]
async fn test_junk_exhausts_budget() {
    let server = TestServer::spawn().await.expect("spawn bridge");
    let mut client = server.connect("junk").await.expect("connect");

    for i in 0..20 {
        client.send_raw(&format!("NOTICE x :junk {i}")).await.unwrap();
    }
    assert!(client.closed().await, "connection should be dropped");
}

#[tokio::test]
async fn test_join_before_registration_is_refused() {
    let server = TestServer::spawn().await.expect("spawn bridge");
    let mut client = server.connect("eager").await.expect("connect");

    client.send_raw("JOIN #early").await.unwrap();
    let reply = client.recv().await.expect("refusal");
    assert_eq!(numeric(&reply), Some(Response::ERR_NOTREGISTERED));

    let burst = client.register().await.expect("registration still possible");
    assert_eq!(numeric(&burst[0]), Some(Response::RPL_WELCOME));
}

#[tokio::test]
async fn test_quit_during_handshake_closes() {
    let server = TestServer::spawn().await.expect("spawn bridge");
    let mut client = server.connect("shy").await.expect("connect");

    client.send_raw("NICK shy").await.unwrap();
    client.send_raw("QUIT :never mind").await.unwrap();
    assert!(client.closed().await);
}
