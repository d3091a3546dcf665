//! Destination address resolution
//!
//! Turns a [`TargetAddr`] into socket addresses the connector can dial.

use super::types::TargetAddr;
use async_trait::async_trait;
use std::fmt::Debug;
use std::io;
use std::net::SocketAddr;

/// Resolver trait for destination addresses
///
/// IP targets resolve to themselves. Domain targets are looked up; an empty
/// answer is reported as [`io::ErrorKind::NotFound`].
#[async_trait]
pub trait Resolver: Debug + Send + Sync + 'static {
    /// Resolve the target into one or more socket addresses
    async fn resolve(&self, target: &TargetAddr) -> io::Result<Vec<SocketAddr>>;
}

/// Resolver backed by the system name service
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, target: &TargetAddr) -> io::Result<Vec<SocketAddr>> {
        match target {
            TargetAddr::Ip(addr) => Ok(vec![*addr]),
            TargetAddr::Domain(domain, port) => {
                let addrs: Vec<SocketAddr> =
                    tokio::net::lookup_host((domain.as_str(), *port)).await?.collect();
                if addrs.is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("No addresses found for domain: {}", domain),
                    ));
                }
                tracing::trace!("Resolved {} to {:?}", target, addrs);
                Ok(addrs)
            }
        }
    }
}
