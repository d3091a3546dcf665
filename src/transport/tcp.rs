//! TCP listener and connector
//!
//! Listener sockets are built through socket2 so SO_REUSEADDR and the
//! backlog can be set before listening.

use super::SocketOpts;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

/// Bind a listening socket on `addr`
pub fn bind_listener(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog.min(i32::MAX as u32) as i32)?;

    TcpListener::from_std(socket.into())
}

/// Outbound TCP connector
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
}

impl TcpConnector {
    /// Create a connector applying the given socket options
    pub fn new(socket_opts: SocketOpts) -> Self {
        TcpConnector { socket_opts }
    }

    /// Connect to the first address that accepts
    ///
    /// Addresses are tried in order; the last error is returned when all of
    /// them fail. No timeout is applied here.
    pub async fn connect(&self, addrs: &[SocketAddr]) -> io::Result<TcpStream> {
        let mut last_err = None;

        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    if let Err(e) = self.socket_opts.apply(&stream) {
                        tracing::warn!("Failed to apply socket options to {}: {}", addr, e);
                    }
                    tracing::debug!("TCP connection established to {}", addr);
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "No addresses to connect to")
        }))
    }
}
