//! TCP acceptor
//!
//! Binds the listening socket and hands every accepted connection to its own
//! task running the SOCKS5 handler. Connections never share state, so a
//! slow or misbehaving client cannot stall the others.

use crate::config::Config;
use crate::error::{Socks5Error, SocksdError};
use crate::socks::{Resolver, Socks5Handler};
use crate::transport::{bind_listener, SocketOpts, TcpConnector};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{lookup_host, TcpListener};
use tokio::sync::broadcast;
use tokio::time;
use tracing::{debug, error, info, trace, warn};

/// Listening SOCKS5 server
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    handler: Arc<Socks5Handler>,
    socket_opts: SocketOpts,
}

impl Server {
    /// Bind the listener described by `config`
    ///
    /// The host is resolved first; the first address that binds wins.
    pub async fn bind(config: &Config) -> Result<Self, SocksdError> {
        let bind_addr = config.server.bind_addr();
        let addrs: Vec<SocketAddr> = lookup_host(bind_addr.as_str())
            .await
            .map_err(|source| SocksdError::Bind {
                addr: bind_addr.clone(),
                source,
            })?
            .collect();

        let mut last_err =
            io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no addresses");
        let mut bound = None;
        for addr in addrs {
            match bind_listener(addr, config.server.backlog) {
                Ok(listener) => {
                    bound = Some(listener);
                    break;
                }
                Err(e) => {
                    debug!("Failed to bind {}: {}", addr, e);
                    last_err = e;
                }
            }
        }
        let listener = bound.ok_or(SocksdError::Bind {
            addr: bind_addr,
            source: last_err,
        })?;

        let socket_opts = SocketOpts::from_tcp_config(&config.server.tcp);
        let handler = Socks5Handler::new(config.socks.clone())
            .with_connector(TcpConnector::new(socket_opts.clone()));

        Ok(Server {
            listener,
            handler: Arc::new(handler),
            socket_opts,
        })
    }

    /// Replace the resolver used for CONNECT targets
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        let handler = (*self.handler).clone().with_resolver(resolver);
        self.handler = Arc::new(handler);
        self
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until a shutdown signal arrives
    ///
    /// Tunnels already running are not interrupted by shutdown; they finish
    /// on their own.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> anyhow::Result<()> {
        info!("SOCKS5 server listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            time::sleep(Duration::from_secs(1)).await;
                            continue;
                        }
                    };
                    trace!("Accepted connection from {}", peer);

                    if let Err(e) = self.socket_opts.apply(&stream) {
                        warn!("{}: failed to apply socket options: {}", peer, e);
                    }

                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        match handler.handle(stream, peer).await {
                            Ok(stats) => info!(
                                "{}: tunnel closed ({}), {} bytes up, {} bytes down",
                                peer, stats.end, stats.client_to_upstream, stats.upstream_to_client
                            ),
                            Err(Socks5Error::PeerClosed) => {
                                debug!("{}: closed before sending a request", peer)
                            }
                            Err(e) if e.is_connect_failure() => warn!("{}: {}", peer, e),
                            Err(e) => debug!("{}: {}", peer, e),
                        }
                    });
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        Ok(())
    }
}
