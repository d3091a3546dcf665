//! Main SOCKS5 handler
//!
//! This module drives one accepted client connection through method
//! negotiation, the CONNECT request, the outbound dial and finally the
//! tunnel relay.
//!
//! # Protocol Flow
//!
//! ```text
//! AwaitingHandshake -> AwaitingRequest -> Connecting -> Tunneling -> Closed
//!         |                   |                |
//!         +-------------------+----------------+--------------------> Closed
//! ```
//!
//! Every rejection sends exactly one reply before the connection closes.

use super::consts::*;
use super::parser::{decode_handshake, decode_request, handshake_frame_len, request_frame_len};
use super::reply::{build_reply, send_method_selection};
use super::resolver::{Resolver, SystemResolver};
use super::tcp_relay::{relay_tcp, RelayOptions, RelayStats};
use super::types::{Request, SocksCommand, TargetAddr};
use crate::config::SocksConfig;
use crate::error::{Socks5Error, Socks5ReplyCode};
use crate::transport::TcpConnector;
use bytes::BytesMut;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, trace};

/// How long a rejected client gets to finish sending before the socket drops
const LINGER_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of a single client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the method negotiation message
    AwaitingHandshake,
    /// Waiting for the CONNECT request
    AwaitingRequest,
    /// Resolving and dialing the destination
    Connecting,
    /// Relaying bytes
    Tunneling,
    /// Terminal state
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::AwaitingHandshake => "awaiting-handshake",
            ConnectionState::AwaitingRequest => "awaiting-request",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Tunneling => "tunneling",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// SOCKS5 connection handler
///
/// Holds the settings shared by every connection of a server. Cloning is
/// cheap; the resolver is reference counted.
#[derive(Debug, Clone)]
pub struct Socks5Handler {
    config: SocksConfig,
    resolver: Arc<dyn Resolver>,
    connector: TcpConnector,
}

impl Socks5Handler {
    /// Create a handler using the system resolver
    pub fn new(config: SocksConfig) -> Self {
        Self {
            config,
            resolver: Arc::new(SystemResolver),
            connector: TcpConnector::default(),
        }
    }

    /// Replace the resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the outbound connector
    pub fn with_connector(mut self, connector: TcpConnector) -> Self {
        self.connector = connector;
        self
    }

    /// Relay settings derived from the configuration
    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            buffer_size: self.config.relay_buffer_size,
            idle_timeout: self.config.idle_timeout(),
        }
    }

    /// Handle SOCKS5 protocol on an accepted stream
    ///
    /// Returns the relay statistics when a tunnel was established and ran to
    /// completion, or the reason the connection was closed early. Either way
    /// the stream has been closed when this returns.
    pub async fn handle<S>(&self, stream: S, peer: SocketAddr) -> Result<RelayStats, Socks5Error>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        Connection::new(stream, peer, self).run().await
    }

    /// Reply code for a failed connect phase
    fn connect_failure_code(&self, err: &Socks5Error) -> Socks5ReplyCode {
        if self.config.detailed_reply_codes {
            err.detailed_reply_code()
        } else {
            Socks5ReplyCode::HostUnreachable
        }
    }

    /// Resolve and dial the target within the connect timeout
    async fn connect(&self, target: &TargetAddr) -> Result<TcpStream, Socks5Error> {
        let timeout = self.config.connect_timeout();

        let dial = async {
            let addrs = self
                .resolver
                .resolve(target)
                .await
                .map_err(|source| Socks5Error::Resolve {
                    target: target.to_string(),
                    source,
                })?;

            self.connector
                .connect(&addrs)
                .await
                .map_err(|source| Socks5Error::Connect {
                    target: target.to_string(),
                    source,
                })
        };

        match tokio::time::timeout(timeout, dial).await {
            Ok(result) => result,
            Err(_) => Err(Socks5Error::ConnectTimeout {
                target: target.to_string(),
                timeout,
            }),
        }
    }
}

/// One client connection moving through [`ConnectionState`]
struct Connection<'a, S> {
    stream: S,
    peer: SocketAddr,
    handler: &'a Socks5Handler,
    state: ConnectionState,
    buf: BytesMut,
    /// A request reply (success or failure) has been written
    replied: bool,
}

impl<'a, S> Connection<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn new(stream: S, peer: SocketAddr, handler: &'a Socks5Handler) -> Self {
        Self {
            stream,
            peer,
            handler,
            state: ConnectionState::AwaitingHandshake,
            buf: BytesMut::with_capacity(MAX_REQUEST_LEN),
            replied: false,
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        trace!("{}: {} -> {}", self.peer, self.state, next);
        self.state = next;
    }

    async fn run(mut self) -> Result<RelayStats, Socks5Error> {
        let upstream = match self.establish().await {
            Ok(upstream) => upstream,
            Err(e) => {
                let negotiated = self.state != ConnectionState::AwaitingHandshake;
                if negotiated && !self.replied && matches!(e, Socks5Error::Io(_)) {
                    // Best effort, the client may be gone already
                    let _ = build_reply(&mut self.stream, Socks5ReplyCode::GeneralFailure).await;
                }
                debug!("{}: closing in state {}: {}", self.peer, self.state, e);
                self.linger_close().await;
                self.transition(ConnectionState::Closed);
                return Err(e);
            }
        };

        self.transition(ConnectionState::Tunneling);
        let options = self.handler.relay_options();
        let peer = self.peer;

        let result = relay_tcp(self.stream, upstream, options).await;
        trace!("{}: {} -> {}", peer, ConnectionState::Tunneling, ConnectionState::Closed);

        Ok(result?)
    }

    /// Drive the connection up to a connected upstream stream
    async fn establish(&mut self) -> Result<TcpStream, Socks5Error> {
        self.negotiate().await?;
        self.transition(ConnectionState::AwaitingRequest);

        let request = self.read_request().await?;
        let target = self.check_request(&request).await?;
        self.transition(ConnectionState::Connecting);

        let upstream = match self.handler.connect(&target).await {
            Ok(upstream) => upstream,
            Err(e) => {
                let code = self.handler.connect_failure_code(&e);
                self.reply(code).await?;
                return Err(e);
            }
        };

        self.reply(Socks5ReplyCode::Succeeded).await?;
        info!("{}: SOCKS5 tunnel established to {}", self.peer, target);

        Ok(upstream)
    }

    /// Method negotiation: only "no authentication" is accepted
    async fn negotiate(&mut self) -> Result<(), Socks5Error> {
        let frame = self
            .read_frame(HANDSHAKE_HEADER_LEN, MAX_HANDSHAKE_LEN, handshake_frame_len)
            .await?
            .ok_or(Socks5Error::PeerClosed)?;

        match decode_handshake(&frame) {
            Ok(handshake) if handshake.offers_no_auth() => {
                send_method_selection(&mut self.stream, Some(SOCKS5_AUTH_METHOD_NONE)).await?;
                debug!("{}: handshake accepted, methods {:?}", self.peer, handshake.methods);
                Ok(())
            }
            Ok(handshake) => {
                send_method_selection(&mut self.stream, None).await?;
                debug!("{}: no acceptable method in {:?}", self.peer, handshake.methods);
                Err(Socks5Error::NoAcceptableMethod)
            }
            Err(e) => {
                send_method_selection(&mut self.stream, None).await?;
                Err(e.into())
            }
        }
    }

    async fn read_request(&mut self) -> Result<Request, Socks5Error> {
        let frame = self
            .read_frame(REQUEST_HEADER_LEN, MAX_REQUEST_LEN, request_frame_len)
            .await?
            .ok_or(Socks5Error::PeerClosed)?;

        match decode_request(&frame) {
            Ok(request) => Ok(request),
            Err(e) => {
                self.reply(Socks5ReplyCode::CommandNotSupported).await?;
                Err(e.into())
            }
        }
    }

    /// Dispatch policy: CONNECT to a representable destination only
    async fn check_request(&mut self, request: &Request) -> Result<TargetAddr, Socks5Error> {
        if request.command() != Some(SocksCommand::Connect) {
            self.reply(Socks5ReplyCode::CommandNotSupported).await?;
            return Err(Socks5Error::CommandNotSupported(request.cmd));
        }

        match request.target() {
            Ok(target) => {
                debug!("{}: CONNECT {}", self.peer, target);
                Ok(target)
            }
            Err(e) => {
                self.reply(Socks5ReplyCode::AddressTypeNotSupported).await?;
                Err(e)
            }
        }
    }

    async fn reply(&mut self, code: Socks5ReplyCode) -> Result<(), Socks5Error> {
        self.replied = true;
        build_reply(&mut self.stream, code).await?;
        Ok(())
    }

    /// Read one frame without consuming anything past its end
    ///
    /// Returns `None` if the peer closed before sending a single byte. A peer
    /// that closes mid-frame yields the partial frame so the parser can
    /// reject it.
    async fn read_frame(
        &mut self,
        header_len: usize,
        max_len: usize,
        frame_len: fn(&[u8]) -> Option<usize>,
    ) -> Result<Option<BytesMut>, Socks5Error> {
        self.buf.clear();

        loop {
            let target = frame_len(&self.buf)
                .unwrap_or_else(|| header_len.max(self.buf.len() + 1))
                .min(max_len);
            if self.buf.len() >= target {
                break;
            }

            let want = target - self.buf.len();
            self.buf.reserve(want);
            let n = (&mut self.stream)
                .take(want as u64)
                .read_buf(&mut self.buf)
                .await?;

            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                debug!(
                    "{}: peer closed mid-frame after {} bytes",
                    self.peer,
                    self.buf.len()
                );
                break;
            }
        }

        Ok(Some(self.buf.split()))
    }

    /// Half-close, then drain input briefly so the last reply is delivered
    async fn linger_close(&mut self) {
        let _ = self.stream.shutdown().await;

        let mut scratch = [0u8; 512];
        let stream = &mut self.stream;
        let drain = async move {
            loop {
                match stream.read(&mut scratch).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        let _ = tokio::time::timeout(LINGER_TIMEOUT, drain).await;
    }
}
