//! # Socksd - Minimal SOCKS5 CONNECT Proxy
//!
//! Socksd is a small SOCKS5 server. It accepts TCP clients, negotiates the
//! "no authentication" method, handles the CONNECT command for IPv4, IPv6
//! and domain destinations, and then relays bytes between the client and the
//! destination until either side closes.
//!
//! ## Features
//!
//! - **Strict Decoding**: Handshake and request frames are decoded by pure
//!   functions that reject truncated or oversized input
//! - **One Reply Per Rejection**: Every failure is answered with exactly one
//!   well-formed reply before the connection closes
//! - **Isolated Connections**: Each client runs in its own task
//! - **Bounded Connects**: Resolution and dialing share one timeout
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksd::config::load_config;
//! use socksd::server::Server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     Server::bind(&config).await?.run(shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> Socksd -> Target
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{DecodeError, Socks5Error, Socks5ReplyCode, SocksdError};
pub use server::Server;

/// Version of the Socksd library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
