//! TCP relay for SOCKS5 CONNECT command
//!
//! Copies bytes between the client and the upstream stream in fixed-size
//! chunks until one side closes, errors, or the tunnel sits idle too long.

use super::consts::DEFAULT_BUFFER_SIZE;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Relay tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOptions {
    /// Chunk size for each read
    pub buffer_size: usize,
    /// Tear the tunnel down after this long without traffic
    pub idle_timeout: Option<Duration>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        RelayOptions {
            buffer_size: DEFAULT_BUFFER_SIZE,
            idle_timeout: None,
        }
    }
}

/// Why the relay stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// Client sent EOF
    ClientClosed,
    /// Upstream sent EOF
    UpstreamClosed,
    /// No traffic in either direction for the idle timeout
    IdleTimeout,
}

impl fmt::Display for RelayEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayEnd::ClientClosed => write!(f, "client closed"),
            RelayEnd::UpstreamClosed => write!(f, "upstream closed"),
            RelayEnd::IdleTimeout => write!(f, "idle timeout"),
        }
    }
}

/// Byte counts for a finished relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied client -> upstream
    pub client_to_upstream: u64,
    /// Bytes copied upstream -> client
    pub upstream_to_client: u64,
    /// How the relay ended
    pub end: RelayEnd,
}

/// Relay data bidirectionally between two streams
///
/// Each direction runs its own copy loop so backpressure on one side never
/// stalls the other. The first EOF, I/O error or idle timeout ends both
/// directions; the streams are shut down and dropped before returning.
pub async fn relay_tcp<A, B>(client: A, upstream: B, options: RelayOptions) -> io::Result<RelayStats>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut upstream_read, mut upstream_write) = tokio::io::split(upstream);

    let buffer_size = options.buffer_size.max(1);
    let activity = Activity::new();
    let client_to_upstream = AtomicU64::new(0);
    let upstream_to_client = AtomicU64::new(0);

    let result = tokio::select! {
        r = copy_chunks(&mut client_read, &mut upstream_write, buffer_size, &client_to_upstream, &activity) => {
            r.map(|_| RelayEnd::ClientClosed)
        }
        r = copy_chunks(&mut upstream_read, &mut client_write, buffer_size, &upstream_to_client, &activity) => {
            r.map(|_| RelayEnd::UpstreamClosed)
        }
        _ = idle_watch(&activity, options.idle_timeout) => Ok(RelayEnd::IdleTimeout),
    };

    // Best effort: the peer may already be gone
    let _ = client_write.shutdown().await;
    let _ = upstream_write.shutdown().await;

    let client_to_upstream = client_to_upstream.load(Ordering::Relaxed);
    let upstream_to_client = upstream_to_client.load(Ordering::Relaxed);

    match result {
        Ok(end) => {
            debug!(
                "Relay finished ({}): {} bytes up, {} bytes down",
                end, client_to_upstream, upstream_to_client
            );
            Ok(RelayStats {
                client_to_upstream,
                upstream_to_client,
                end,
            })
        }
        Err(e) => {
            debug!(
                "Relay error after {} bytes up, {} bytes down: {}",
                client_to_upstream, upstream_to_client, e
            );
            Err(e)
        }
    }
}

/// Last time either direction moved bytes
struct Activity {
    start: Instant,
    /// Milliseconds since `start`
    last: AtomicU64,
}

impl Activity {
    fn new() -> Self {
        Activity {
            start: Instant::now(),
            last: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        let elapsed = self.start.elapsed().as_millis() as u64;
        self.last.store(elapsed, Ordering::Relaxed);
    }

    fn deadline(&self, idle: Duration) -> Instant {
        self.start + Duration::from_millis(self.last.load(Ordering::Relaxed)) + idle
    }
}

/// Copy one direction in fixed-size chunks until EOF
async fn copy_chunks<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
    copied: &AtomicU64,
    activity: &Activity,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buffer_size];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        activity.touch();

        writer.write_all(&buf[..n]).await?;
        copied.fetch_add(n as u64, Ordering::Relaxed);
        activity.touch();
        trace!("relayed {} bytes", n);
    }
}

/// Resolve once no traffic has been seen for `idle`; never without a timeout
async fn idle_watch(activity: &Activity, idle: Option<Duration>) {
    let idle = match idle {
        Some(idle) => idle,
        None => return std::future::pending().await,
    };

    loop {
        let deadline = activity.deadline(idle);
        if Instant::now() >= deadline {
            return;
        }
        tokio::time::sleep_until(deadline).await;
    }
}
