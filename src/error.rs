//! Error types for Socksd
//!
//! This module defines all custom error types used throughout the application.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for Socksd operations
#[derive(Error, Debug)]
pub enum SocksdError {
    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failed to bind the listening socket
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was being bound
        addr: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },
}

/// Wire format decoding errors
///
/// Raised by the pure parser when a handshake or request buffer is
/// malformed, truncated or carries trailing bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer shorter than the fixed header
    #[error("Message too short: need at least {needed} bytes, got {actual}")]
    TooShort {
        /// Minimum header length
        needed: usize,
        /// Length of the supplied buffer
        actual: usize,
    },

    /// Version byte is not 5
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Buffer length does not match the length declared by the message
    #[error("Length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Length implied by the message fields
        expected: usize,
        /// Length of the supplied buffer
        actual: usize,
    },

    /// ATYP is not IPv4, domain or IPv6
    #[error("Unsupported address type: {0}")]
    UnsupportedAddressType(u8),

    /// Domain length byte outside 1..=254
    #[error("Invalid domain length: {0}")]
    InvalidDomainLength(u8),
}

/// SOCKS5 specific errors
///
/// Each variant is a terminal outcome for one connection.
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Malformed handshake or request
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// No acceptable authentication method
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Command not supported
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Invalid domain name
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    /// Peer closed the connection before a complete message arrived
    #[error("Peer closed the connection")]
    PeerClosed,

    /// Destination name did not resolve
    #[error("Failed to resolve {target}: {source}")]
    Resolve {
        /// Destination as requested by the client
        target: String,
        /// Resolver error
        #[source]
        source: io::Error,
    },

    /// Outbound connect did not finish in time
    #[error("Connection to {target} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Destination as requested by the client
        target: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// Outbound connect failed
    #[error("Failed to connect to {target}: {source}")]
    Connect {
        /// Destination as requested by the client
        target: String,
        /// Last connect error
        #[source]
        source: io::Error,
    },

    /// IO error on the client stream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Socks5Error {
    /// Whether this error came out of the connect phase (resolve or dial)
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            Socks5Error::Resolve { .. }
                | Socks5Error::ConnectTimeout { .. }
                | Socks5Error::Connect { .. }
        )
    }

    /// Reply code for a connect-phase failure using the per-error-kind mapping
    pub fn detailed_reply_code(&self) -> Socks5ReplyCode {
        match self {
            Socks5Error::Resolve { .. } | Socks5Error::ConnectTimeout { .. } => {
                Socks5ReplyCode::HostUnreachable
            }
            Socks5Error::Connect { source, .. } => Socks5ReplyCode::from(source),
            _ => Socks5ReplyCode::GeneralFailure,
        }
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for Socks5ReplyCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Socks5ReplyCode::Succeeded),
            0x01 => Ok(Socks5ReplyCode::GeneralFailure),
            0x02 => Ok(Socks5ReplyCode::ConnectionNotAllowed),
            0x03 => Ok(Socks5ReplyCode::NetworkUnreachable),
            0x04 => Ok(Socks5ReplyCode::HostUnreachable),
            0x05 => Ok(Socks5ReplyCode::ConnectionRefused),
            0x06 => Ok(Socks5ReplyCode::TtlExpired),
            0x07 => Ok(Socks5ReplyCode::CommandNotSupported),
            0x08 => Ok(Socks5ReplyCode::AddressTypeNotSupported),
            other => Err(other),
        }
    }
}

impl From<&io::Error> for Socks5ReplyCode {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Socks5ReplyCode::ConnectionRefused,
            io::ErrorKind::TimedOut => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::AddrNotAvailable => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::NotFound => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::HostUnreachable => Socks5ReplyCode::HostUnreachable,
            io::ErrorKind::NetworkUnreachable => Socks5ReplyCode::NetworkUnreachable,
            io::ErrorKind::PermissionDenied => Socks5ReplyCode::ConnectionNotAllowed,
            _ => Socks5ReplyCode::GeneralFailure,
        }
    }
}
