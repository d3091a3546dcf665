//! SOCKS5 protocol constants
//!
//! Defines all constants used in the SOCKS5 protocol implementation.

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
/// No acceptable methods
pub const SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xFF;

// Commands
/// TCP CONNECT command
pub const SOCKS5_CMD_TCP_CONNECT: u8 = 0x01;
/// TCP BIND command (not implemented)
pub const SOCKS5_CMD_TCP_BIND: u8 = 0x02;
/// UDP ASSOCIATE command (not implemented)
pub const SOCKS5_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

// Reserved byte
/// Reserved byte value (always 0x00)
pub const SOCKS5_RESERVED: u8 = 0x00;

// Frame sizes
/// Handshake header: VER NMETHODS
pub const HANDSHAKE_HEADER_LEN: usize = 2;
/// Request header: VER CMD RSV ATYP
pub const REQUEST_HEADER_LEN: usize = 4;
/// Largest possible handshake (255 methods)
pub const MAX_HANDSHAKE_LEN: usize = HANDSHAKE_HEADER_LEN + 255;
/// Largest request buffered before decoding (length byte 255 plus port)
pub const MAX_REQUEST_LEN: usize = REQUEST_HEADER_LEN + 1 + 255 + 2;
/// Maximum domain name length accepted in a request
pub const MAX_DOMAIN_LEN: usize = 254;
/// Length of every reply sent by the server
pub const REPLY_LEN: usize = 10;

/// Default chunk size for tunnel relay
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
