//! SOCKS5 module for Socksd
//!
//! This module implements the server side of SOCKS5 (RFC 1928) restricted
//! to the "no authentication" method and the CONNECT command. Message
//! decoding is pure and lives in [`parser`]; the per-connection state
//! machine lives in [`Socks5Handler`].

mod consts;
mod handler;
pub mod parser;
mod reply;
mod resolver;
mod tcp_relay;
mod types;

pub use consts::*;
pub use handler::{ConnectionState, Socks5Handler};
pub use parser::{decode_handshake, decode_request};
pub use reply::{build_reply, reply_bytes, send_method_selection};
pub use resolver::{Resolver, SystemResolver};
pub use tcp_relay::{relay_tcp, RelayEnd, RelayOptions, RelayStats};
pub use types::{DestAddr, Handshake, Request, SocksCommand, TargetAddr};
