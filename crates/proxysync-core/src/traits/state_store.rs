// # State Store Trait
//
// Persists the last known IP of each monitored hostname.
//
// ## Purpose
//
// Change detection compares a fresh resolution against the previously
// recorded address. Without persistence, a daemon restart forgets every
// previous address and a DNS change that happened while it was down can
// only be caught by the heuristic drift check.

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::error::Result;

/// State record for a monitored hostname
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StateRecord {
    /// The last known IP address
    pub last_ip: Ipv4Addr,
    /// Timestamp of the last change
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

impl StateRecord {
    /// Create a new state record stamped now
    pub(crate) fn new(last_ip: Ipv4Addr) -> Self {
        Self {
            last_ip,
            last_updated: chrono::Utc::now(),
        }
    }
}

/// Trait for state store implementations
///
/// All methods must be safe to call concurrently from multiple tasks.
/// Only the reconciler writes, and only from inside a pass.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the last known IP for a hostname
    async fn get_last_ip(&self, hostname: &str) -> Result<Option<Ipv4Addr>>;

    /// Record a new last known IP
    async fn set_last_ip(&self, hostname: &str, ip: Ipv4Addr) -> Result<()>;

    /// Forget a hostname
    async fn delete_record(&self, hostname: &str) -> Result<()>;

    /// All stored records
    async fn list_records(&self) -> Result<Vec<(String, StateRecord)>>;

    /// Persist pending changes
    async fn flush(&self) -> Result<()>;
}
