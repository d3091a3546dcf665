//! End-to-end tests driving the proxy over real sockets

mod common;

use common::*;
use futures::future::join_all;
use socksd::config::Config;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

#[tokio::test]
async fn test_handshake_accepts_no_auth() {
    let proxy = TestProxy::start().await;
    let mut client = proxy.connect().await;

    negotiate(&mut client).await;
}

#[tokio::test]
async fn test_handshake_without_no_auth_is_rejected() {
    let proxy = TestProxy::start().await;
    let mut client = proxy.connect().await;

    client.write_all(&[0x05, 0x02, 0x01, 0x02]).await.unwrap();
    let response = read_until_closed(&mut client).await;
    assert_eq!(response, vec![0x05, 0xFF]);
}

#[tokio::test]
async fn test_connect_ipv4_and_relay() {
    let echo = spawn_echo_server().await;
    let proxy = TestProxy::start().await;
    let mut client = proxy.connect().await;

    negotiate(&mut client).await;
    let reply = send_request(&mut client, &connect_request(echo)).await;
    assert_eq!(reply, expected_reply(0x00));

    client.write_all(b"hello through socks").await.unwrap();
    let mut echoed = [0u8; 19];
    client.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"hello through socks");
}

#[tokio::test]
async fn test_connect_domain() {
    let echo = spawn_echo_server().await;
    let resolver = StaticResolver::default().with_host("example.com", echo.ip());
    let proxy = TestProxy::start_with(test_config(), Some(Arc::new(resolver))).await;
    let mut client = proxy.connect().await;

    negotiate(&mut client).await;
    let request = connect_domain_request("example.com", echo.port());
    let reply = send_request(&mut client, &request).await;
    assert_eq!(reply, expected_reply(0x00));

    client.write_all(b"via domain").await.unwrap();
    let mut echoed = [0u8; 10];
    client.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"via domain");
}

#[tokio::test]
async fn test_unsupported_address_type() {
    let proxy = TestProxy::start().await;
    let mut client = proxy.connect().await;

    negotiate(&mut client).await;
    client
        .write_all(&[0x05, 0x01, 0x00, 0x02, 1, 2, 3, 4, 0x00, 0x50])
        .await
        .unwrap();

    let response = read_until_closed(&mut client).await;
    assert_eq!(response, expected_reply(0x07).to_vec());
}

#[tokio::test]
async fn test_bind_command_not_supported() {
    let echo = spawn_echo_server().await;
    let proxy = TestProxy::start().await;
    let mut client = proxy.connect().await;

    negotiate(&mut client).await;
    let mut request = connect_request(echo);
    request[1] = 0x02;
    client.write_all(&request).await.unwrap();

    let response = read_until_closed(&mut client).await;
    assert_eq!(response, expected_reply(0x07).to_vec());
}

#[tokio::test]
async fn test_connect_failure_replies_host_unreachable() {
    let proxy = TestProxy::start().await;
    let mut client = proxy.connect().await;

    negotiate(&mut client).await;
    client.write_all(&connect_request(unused_addr())).await.unwrap();

    let response = read_until_closed(&mut client).await;
    assert_eq!(response, expected_reply(0x04).to_vec());
}

#[tokio::test]
async fn test_connect_failure_detailed_code() {
    let mut config = test_config();
    config.socks.detailed_reply_codes = true;
    let proxy = TestProxy::start_with(config, None).await;
    let mut client = proxy.connect().await;

    negotiate(&mut client).await;
    client.write_all(&connect_request(unused_addr())).await.unwrap();

    let response = read_until_closed(&mut client).await;
    assert_eq!(response, expected_reply(0x05).to_vec());
}

#[tokio::test]
async fn test_client_closes_mid_request() {
    let proxy = TestProxy::start().await;
    let mut client = proxy.connect().await;

    negotiate(&mut client).await;
    client.write_all(&[0x05, 0x01, 0x00, 0x01, 127]).await.unwrap();
    client.shutdown().await.unwrap();

    let response = read_until_closed(&mut client).await;
    assert_eq!(response, expected_reply(0x07).to_vec());

    // The proxy keeps serving new clients
    let mut next = proxy.connect().await;
    negotiate(&mut next).await;
}

#[tokio::test]
async fn test_connect_domain_uses_requested_port() {
    let echo = spawn_echo_server().await;
    let resolver = StaticResolver::default().with_host("example.com", echo.ip());
    let proxy = TestProxy::start_with(test_config(), Some(Arc::new(resolver))).await;
    let mut client = proxy.connect().await;

    // Same host, a port nobody listens on
    negotiate(&mut client).await;
    let request = connect_domain_request("example.com", unused_addr().port());
    client.write_all(&request).await.unwrap();

    let response = read_until_closed(&mut client).await;
    assert_eq!(response, expected_reply(0x04).to_vec());
}

#[tokio::test]
async fn test_concurrent_clients() {
    let (echo, upstreams_closed) = spawn_counting_echo_server().await;
    let proxy = TestProxy::start().await;

    let clients = (0..50u32).map(|i| {
        let addr = proxy.addr;
        async move {
            let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
            negotiate(&mut client).await;
            let reply = send_request(&mut client, &connect_request(echo)).await;
            assert_eq!(reply, expected_reply(0x00));

            let message = format!("client-{:02}", i);
            client.write_all(message.as_bytes()).await.unwrap();
            let mut echoed = vec![0u8; message.len()];
            client.read_exact(&mut echoed).await.unwrap();
            assert_eq!(echoed, message.as_bytes());

            // Closing our side tears down the tunnel and the client socket
            client.shutdown().await.unwrap();
            let rest = timeout(Duration::from_secs(5), read_until_closed(&mut client))
                .await
                .expect("Proxy did not close the client side");
            assert!(rest.is_empty());
        }
    });

    timeout(Duration::from_secs(30), join_all(clients))
        .await
        .expect("Concurrent clients timed out");

    timeout(Duration::from_secs(5), async {
        while upstreams_closed.load(Ordering::SeqCst) < 50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Not every upstream connection was closed");
    assert_eq!(upstreams_closed.load(Ordering::SeqCst), 50);
}

#[tokio::test]
async fn test_upstream_close_closes_client() {
    let (listener, upstream_addr) = create_test_listener().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"goodbye").await.unwrap();
    });

    let proxy = TestProxy::start().await;
    let mut client = proxy.connect().await;

    negotiate(&mut client).await;
    let reply = send_request(&mut client, &connect_request(upstream_addr)).await;
    assert_eq!(reply, expected_reply(0x00));

    let rest = read_until_closed(&mut client).await;
    assert_eq!(rest, b"goodbye");
}

#[tokio::test]
async fn test_idle_tunnel_is_closed() {
    let echo = spawn_echo_server().await;
    let mut config: Config = test_config();
    config.socks.idle_timeout = 1;
    let proxy = TestProxy::start_with(config, None).await;
    let mut client = proxy.connect().await;

    negotiate(&mut client).await;
    let reply = send_request(&mut client, &connect_request(echo)).await;
    assert_eq!(reply, expected_reply(0x00));

    let rest = timeout(Duration::from_secs(5), read_until_closed(&mut client))
        .await
        .expect("Idle tunnel was not closed");
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_async_socks5_client() {
    let echo = spawn_echo_server().await;
    let proxy = TestProxy::start().await;
    let mut client = proxy.connect().await;

    async_socks5::connect(&mut client, echo, None).await.unwrap();

    client.write_all(b"third-party client").await.unwrap();
    let mut echoed = [0u8; 18];
    client.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"third-party client");
}
