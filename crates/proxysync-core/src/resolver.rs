//! System resolver
//!
//! Uses the operating system's resolver through `tokio::net::lookup_host`,
//! bounded by a timeout. Only IPv4 answers are considered; the first one wins.

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::Resolver;

/// Default upper bound on a single lookup
const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolver backed by the system's name service
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    /// Create a resolver with the given per-lookup timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLVE_TIMEOUT)
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, hostname: &str) -> Result<Ipv4Addr> {
        let lookup = tokio::net::lookup_host((hostname, 0));

        let addrs = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| {
                Error::resolution(hostname, format!("timed out after {:?}", self.timeout))
            })?
            .map_err(|e| Error::resolution(hostname, e.to_string()))?;

        let ip = addrs
            .filter_map(|addr| match addr.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| Error::resolution(hostname, "no IPv4 address"))?;

        debug!(hostname, %ip, "Resolved");
        Ok(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ipv4_literal_resolves_to_itself() {
        let resolver = SystemResolver::default();
        let ip = resolver.resolve("93.184.216.34").await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(93, 184, 216, 34));
    }

    #[tokio::test]
    async fn invalid_name_is_a_resolution_error() {
        let resolver = SystemResolver::new(Duration::from_secs(2));
        let err = resolver.resolve("bad name with spaces..invalid").await.unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
    }
}
