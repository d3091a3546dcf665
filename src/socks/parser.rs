//! SOCKS5 wire format parser
//!
//! Pure decoding of the method negotiation and request messages. Nothing in
//! here performs I/O; the connection handler buffers bytes from the client
//! and hands complete frames to [`decode_handshake`] and [`decode_request`].
//!
//! # Handshake
//!
//! ```text
//! +----+----------+----------+
//! |VER | NMETHODS | METHODS  |
//! +----+----------+----------+
//! | 1  |    1     | 1 to 255 |
//! +----+----------+----------+
//! ```
//!
//! # Request
//!
//! ```text
//! +----+-----+-------+------+----------+----------+
//! |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
//! +----+-----+-------+------+----------+----------+
//! | 1  |  1  | X'00' |  1   | Variable |    2     |
//! +----+-----+-------+------+----------+----------+
//! ```

use super::consts::*;
use super::types::{DestAddr, Handshake, Request};
use crate::error::DecodeError;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Decode a method negotiation message
///
/// The buffer must hold exactly one handshake: `2 + NMETHODS` bytes.
pub fn decode_handshake(buf: &[u8]) -> Result<Handshake, DecodeError> {
    if buf.len() < HANDSHAKE_HEADER_LEN {
        return Err(DecodeError::TooShort {
            needed: HANDSHAKE_HEADER_LEN,
            actual: buf.len(),
        });
    }

    let version = buf[0];
    if version != SOCKS5_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let nmethods = buf[1];
    let expected = HANDSHAKE_HEADER_LEN + nmethods as usize;
    if buf.len() != expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: buf.len(),
        });
    }

    Ok(Handshake {
        version,
        nmethods,
        methods: buf[HANDSHAKE_HEADER_LEN..].to_vec(),
    })
}

/// Decode a request message
///
/// The buffer must hold exactly one request; short buffers, trailing bytes,
/// unknown address types and domain lengths outside `1..=254` all fail.
pub fn decode_request(buf: &[u8]) -> Result<Request, DecodeError> {
    if buf.len() < REQUEST_HEADER_LEN {
        return Err(DecodeError::TooShort {
            needed: REQUEST_HEADER_LEN,
            actual: buf.len(),
        });
    }

    let version = buf[0];
    let cmd = buf[1];
    let rsv = buf[2];
    let atyp = buf[3];

    if version != SOCKS5_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let expected = expected_request_len(atyp, &buf[REQUEST_HEADER_LEN..])?;
    if buf.len() != expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: buf.len(),
        });
    }

    let body = &buf[REQUEST_HEADER_LEN..expected - 2];
    let dst_addr = match atyp {
        SOCKS5_ADDR_TYPE_IPV4 => {
            let mut octets = [0u8; 4];
            octets.copy_from_slice(body);
            DestAddr::Ipv4(Ipv4Addr::from(octets))
        }
        SOCKS5_ADDR_TYPE_IPV6 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(body);
            DestAddr::Ipv6(Ipv6Addr::from(octets))
        }
        // Length byte already validated by expected_request_len
        _ => DestAddr::Domain(body[1..].to_vec()),
    };

    let dst_port = u16::from_be_bytes([buf[expected - 2], buf[expected - 1]]);

    Ok(Request {
        version,
        cmd,
        rsv,
        dst_addr,
        dst_port,
    })
}

/// Total request length implied by ATYP and the bytes following the header
fn expected_request_len(atyp: u8, rest: &[u8]) -> Result<usize, DecodeError> {
    let addr_len = match atyp {
        SOCKS5_ADDR_TYPE_IPV4 => 4,
        SOCKS5_ADDR_TYPE_IPV6 => 16,
        SOCKS5_ADDR_TYPE_DOMAIN => {
            let len = *rest.first().ok_or(DecodeError::TooShort {
                needed: REQUEST_HEADER_LEN + 1,
                actual: REQUEST_HEADER_LEN,
            })?;
            if len == 0 || len as usize > MAX_DOMAIN_LEN {
                return Err(DecodeError::InvalidDomainLength(len));
            }
            1 + len as usize
        }
        other => return Err(DecodeError::UnsupportedAddressType(other)),
    };

    Ok(REQUEST_HEADER_LEN + addr_len + 2)
}

/// Length of the handshake frame at the start of `buf`, once known
///
/// Returns `None` while the header is incomplete. A prefix that can never
/// become a valid handshake reports its current length so the caller stops
/// reading and lets [`decode_handshake`] reject it.
pub fn handshake_frame_len(buf: &[u8]) -> Option<usize> {
    match buf {
        [] => None,
        [version, ..] if *version != SOCKS5_VERSION => Some(buf.len()),
        [_] => None,
        [_, nmethods, ..] => Some(HANDSHAKE_HEADER_LEN + *nmethods as usize),
    }
}

/// Length of the request frame at the start of `buf`, once known
///
/// Same contract as [`handshake_frame_len`].
pub fn request_frame_len(buf: &[u8]) -> Option<usize> {
    match buf.first() {
        None => return None,
        Some(&version) if version != SOCKS5_VERSION => return Some(buf.len()),
        _ => {}
    }
    if buf.len() < REQUEST_HEADER_LEN {
        return None;
    }

    match buf[3] {
        SOCKS5_ADDR_TYPE_DOMAIN if buf.len() == REQUEST_HEADER_LEN => None,
        atyp => match expected_request_len(atyp, &buf[REQUEST_HEADER_LEN..]) {
            Ok(len) => Some(len),
            Err(_) => Some(buf.len()),
        },
    }
}
