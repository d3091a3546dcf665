//! Server configuration types
//!
//! Defines the main configuration structures for the Socksd server.

use super::TcpConfig;
use crate::error::SocksdError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1080
}

fn default_backlog() -> u32 {
    128
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// SOCKS5 protocol configuration
    #[serde(default)]
    pub socks: SocksConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SocksdError> {
        self.server.validate()?;
        self.socks.validate()
    }
}

/// Listener configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host name or address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind (0 picks an ephemeral port)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: u32,

    /// Socket options for accepted and upstream connections
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            backlog: default_backlog(),
            tcp: TcpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for resolution
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Validate the listener configuration
    pub fn validate(&self) -> Result<(), SocksdError> {
        if self.host.trim().is_empty() {
            return Err(SocksdError::Config("Listen host must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Default outbound connect timeout in seconds
fn default_connect_timeout() -> u64 {
    5
}

/// Default relay chunk size
fn default_relay_buffer_size() -> usize {
    4096
}

/// SOCKS5 protocol configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SocksConfig {
    /// Outbound connect timeout in seconds (covers resolution and dial)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Tunnel idle timeout in seconds (0 = no idle timeout)
    #[serde(default)]
    pub idle_timeout: u64,

    /// Chunk size used by the tunnel relay
    #[serde(default = "default_relay_buffer_size")]
    pub relay_buffer_size: usize,

    /// Map connect failures to distinct reply codes instead of always
    /// answering "host unreachable"
    #[serde(default)]
    pub detailed_reply_codes: bool,
}

impl Default for SocksConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            idle_timeout: 0,
            relay_buffer_size: default_relay_buffer_size(),
            detailed_reply_codes: false,
        }
    }
}

impl SocksConfig {
    /// Outbound connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Tunnel idle timeout, if enabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SocksdError> {
        if self.connect_timeout == 0 {
            return Err(SocksdError::Config(
                "connect_timeout must be greater than zero".to_string(),
            ));
        }
        if self.relay_buffer_size == 0 {
            return Err(SocksdError::Config(
                "relay_buffer_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
