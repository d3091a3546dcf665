//! SOCKS5 reply builder
//!
//! Constructs the method selection and request replies.

use super::consts::*;
use crate::error::Socks5ReplyCode;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Encode a request reply
///
/// The server never reports its bound address, so BND.ADDR is always the
/// zero IPv4 address and BND.PORT is zero.
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   |    4     |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
pub fn reply_bytes(reply_code: Socks5ReplyCode) -> [u8; REPLY_LEN] {
    [
        SOCKS5_VERSION,
        reply_code.into(),
        SOCKS5_RESERVED,
        SOCKS5_ADDR_TYPE_IPV4,
        0,
        0,
        0,
        0,
        0,
        0,
    ]
}

/// Build and send a request reply
pub async fn build_reply<S>(stream: &mut S, reply_code: Socks5ReplyCode) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&reply_bytes(reply_code)).await?;
    stream.flush().await
}

/// Send the method selection reply
///
/// `None` answers "no acceptable methods".
pub async fn send_method_selection<S>(stream: &mut S, method: Option<u8>) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let method = method.unwrap_or(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE);
    stream.write_all(&[SOCKS5_VERSION, method]).await?;
    stream.flush().await
}
