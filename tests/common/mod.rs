//! Test utilities for Socksd
//!
//! Helpers shared across integration tests: throwaway upstream servers,
//! raw SOCKS5 message builders and a proxy running on an ephemeral port.

#![allow(dead_code)]

use async_trait::async_trait;
use socksd::config::Config;
use socksd::socks::{Resolver, TargetAddr};
use socksd::Server;
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Echo server accepting any number of connections
pub async fn spawn_echo_server() -> SocketAddr {
    spawn_counting_echo_server().await.0
}

/// Echo server that counts connections it has seen closed by the peer
pub async fn spawn_counting_echo_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let (listener, addr) = create_test_listener().await;
    let closed = Arc::new(AtomicUsize::new(0));
    let counter = closed.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let counter = counter.clone();
            tokio::spawn(async move {
                let (mut r, mut w) = stream.split();
                let _ = tokio::io::copy(&mut r, &mut w).await;
                drop(stream);
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
    });
    (addr, closed)
}

/// Address with nothing listening on it
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Resolver answering from a fixed host table
#[derive(Debug, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, IpAddr>,
}

impl StaticResolver {
    /// Map `domain` to `ip`
    pub fn with_host(mut self, domain: &str, ip: IpAddr) -> Self {
        self.hosts.insert(domain.to_string(), ip);
        self
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, target: &TargetAddr) -> io::Result<Vec<SocketAddr>> {
        match target {
            TargetAddr::Ip(addr) => Ok(vec![*addr]),
            TargetAddr::Domain(domain, port) => self
                .hosts
                .get(domain)
                .map(|ip| vec![SocketAddr::new(*ip, *port)])
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, domain.clone())),
        }
    }
}

/// Proxy running in the background for the duration of a test
pub struct TestProxy {
    /// Address clients connect to
    pub addr: SocketAddr,
    shutdown_tx: broadcast::Sender<bool>,
}

impl TestProxy {
    /// Start a proxy with default settings
    pub async fn start() -> Self {
        Self::start_with(test_config(), None).await
    }

    /// Start a proxy with the given configuration and optional resolver
    pub async fn start_with(config: Config, resolver: Option<Arc<dyn Resolver>>) -> Self {
        let mut server = Server::bind(&config).await.unwrap();
        if let Some(resolver) = resolver {
            server = server.with_resolver(resolver);
        }
        let addr = server.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(server.run(shutdown_rx));

        TestProxy { addr, shutdown_tx }
    }

    /// Open a raw TCP connection to the proxy
    pub async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).await.unwrap()
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Configuration bound to an ephemeral loopback port
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config
}

/// Handshake offering only "no authentication"
pub const NO_AUTH_HANDSHAKE: [u8; 3] = [0x05, 0x01, 0x00];

/// Reply expected for a given code
pub fn expected_reply(code: u8) -> [u8; 10] {
    [0x05, code, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
}

/// CONNECT request for an IP destination
pub fn connect_request(addr: SocketAddr) -> Vec<u8> {
    let mut request = vec![0x05, 0x01, 0x00];
    match addr.ip() {
        IpAddr::V4(ip) => {
            request.push(0x01);
            request.extend_from_slice(&ip.octets());
        }
        IpAddr::V6(ip) => {
            request.push(0x04);
            request.extend_from_slice(&ip.octets());
        }
    }
    request.extend_from_slice(&addr.port().to_be_bytes());
    request
}

/// CONNECT request for a domain destination
pub fn connect_domain_request(domain: &str, port: u16) -> Vec<u8> {
    let mut request = vec![0x05, 0x01, 0x00, 0x03, domain.len() as u8];
    request.extend_from_slice(domain.as_bytes());
    request.extend_from_slice(&port.to_be_bytes());
    request
}

/// Send the handshake and assert the "no authentication" selection
pub async fn negotiate(stream: &mut TcpStream) {
    stream.write_all(&NO_AUTH_HANDSHAKE).await.unwrap();
    let mut response = [0u8; 2];
    stream.read_exact(&mut response).await.unwrap();
    assert_eq!(response, [0x05, 0x00]);
}

/// Send a request and return the 10-byte reply
pub async fn send_request(stream: &mut TcpStream, request: &[u8]) -> [u8; 10] {
    stream.write_all(request).await.unwrap();
    let mut reply = [0u8; 10];
    stream.read_exact(&mut reply).await.unwrap();
    reply
}

/// Read until the proxy closes the connection
pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut rest = Vec::new();
    let _ = stream.read_to_end(&mut rest).await;
    rest
}
