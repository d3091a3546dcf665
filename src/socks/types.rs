//! SOCKS5 type definitions
//!
//! Defines the decoded handshake/request messages and the address types
//! used between parsing and connecting.

use super::consts::*;
use crate::error::Socks5Error;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// SOCKS5 command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for incoming connection (not implemented)
    Bind,
    /// UDP ASSOCIATE - establish UDP relay (not implemented)
    UdpAssociate,
}

impl SocksCommand {
    /// Parse a command byte into SocksCommand
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => Some(SocksCommand::Connect),
            SOCKS5_CMD_TCP_BIND => Some(SocksCommand::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Some(SocksCommand::UdpAssociate),
            _ => None,
        }
    }
}

impl fmt::Display for SocksCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksCommand::Connect => write!(f, "CONNECT"),
            SocksCommand::Bind => write!(f, "BIND"),
            SocksCommand::UdpAssociate => write!(f, "UDP ASSOCIATE"),
        }
    }
}

/// Method negotiation message sent by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Protocol version (always 5 once decoded)
    pub version: u8,
    /// Number of offered methods
    pub nmethods: u8,
    /// Offered authentication methods, in client order
    pub methods: Vec<u8>,
}

impl Handshake {
    /// Whether the client offered "no authentication"
    pub fn offers_no_auth(&self) -> bool {
        self.methods.contains(&SOCKS5_AUTH_METHOD_NONE)
    }
}

/// Destination address exactly as it appeared on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestAddr {
    /// ATYP 0x01
    Ipv4(Ipv4Addr),
    /// ATYP 0x04
    Ipv6(Ipv6Addr),
    /// ATYP 0x03, raw name bytes (1..=254 of them)
    Domain(Vec<u8>),
}

/// Connect request sent by the client after negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Protocol version (always 5 once decoded)
    pub version: u8,
    /// Raw command byte
    pub cmd: u8,
    /// Reserved byte, recorded but not enforced
    pub rsv: u8,
    /// Destination address
    pub dst_addr: DestAddr,
    /// Destination port
    pub dst_port: u16,
}

impl Request {
    /// Decoded command, `None` for unknown command bytes
    pub fn command(&self) -> Option<SocksCommand> {
        SocksCommand::from_byte(self.cmd)
    }

    /// Convert the destination into something the resolver can connect to
    ///
    /// Fails when a domain name is not valid UTF-8.
    pub fn target(&self) -> Result<TargetAddr, Socks5Error> {
        match &self.dst_addr {
            DestAddr::Ipv4(ip) => Ok(TargetAddr::ipv4(*ip, self.dst_port)),
            DestAddr::Ipv6(ip) => Ok(TargetAddr::ipv6(*ip, self.dst_port)),
            DestAddr::Domain(name) => match std::str::from_utf8(name) {
                Ok(domain) => Ok(TargetAddr::domain(domain.to_string(), self.dst_port)),
                Err(_) => Err(Socks5Error::InvalidDomain(
                    String::from_utf8_lossy(name).into_owned(),
                )),
            },
        }
    }
}

/// Target address for SOCKS5 requests
///
/// Represents the destination address in a SOCKS5 request.
/// Can be an IP address (v4 or v6) or a domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl TargetAddr {
    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new TargetAddr from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new TargetAddr from a domain name and port
    pub fn domain(domain: String, port: u16) -> Self {
        TargetAddr::Domain(domain, port)
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}
