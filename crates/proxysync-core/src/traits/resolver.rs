// # Resolver Trait
//
// Forward DNS lookup for monitored hostnames.
//
// A failed lookup (NXDOMAIN, timeout, no network) is reported as
// `Error::Resolution`. Callers treat it as "skip this hostname this pass",
// never as "the hostname has no address": the last known IP is kept.

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::error::Result;

/// Trait for hostname resolution
///
/// Implementations must bound every lookup in time; the reconciler holds its
/// lock for the whole pass and a hung lookup would stall every trigger.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve a hostname to its current IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(ip)`: the current address
    /// - `Err(Error::Resolution)`: lookup failed or timed out
    async fn resolve(&self, hostname: &str) -> Result<Ipv4Addr>;
}
