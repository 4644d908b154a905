//! Registry of monitored hostnames
//!
//! The registry records, for every monitored hostname, where it came from
//! (static configuration or auto-discovery) and the last address a
//! successful resolution produced.
//!
//! ## Ownership
//!
//! The [`Reconciler`](crate::Reconciler) owns the only instance, behind the
//! lock that serializes passes. All mutation happens inside a pass; readers
//! outside a pass get a [`DomainRegistry::snapshot`] copy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// How a hostname entered the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainOrigin {
    /// Listed in the static configuration
    Explicit,
    /// Found in a proxy config `server_name` directive
    AutoDiscovered,
}

/// A monitored hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// Normalized hostname (lowercase, no trailing dot)
    pub hostname: String,
    /// Free-form description
    pub description: String,
    /// Last address from a successful resolution
    pub last_known_ip: Option<Ipv4Addr>,
    /// Where the hostname came from
    pub origin: DomainOrigin,
}

/// Normalize a hostname into its registry key
pub fn normalize_hostname(hostname: &str) -> String {
    hostname.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// In-memory registry of monitored hostnames
#[derive(Debug, Clone, Default)]
pub struct DomainRegistry {
    records: BTreeMap<String, DomainRecord>,
}

impl DomainRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a hostname or update its metadata
    ///
    /// An existing record keeps its last known IP. An explicit origin wins
    /// over auto-discovery, so a discovered hostname later added to the
    /// static configuration becomes explicit, never the reverse.
    ///
    /// Returns `true` if the hostname was not present before.
    pub fn upsert(
        &mut self,
        hostname: &str,
        origin: DomainOrigin,
        description: impl Into<String>,
    ) -> bool {
        let key = normalize_hostname(hostname);
        let description = description.into();

        match self.records.get_mut(&key) {
            Some(record) => {
                if origin == DomainOrigin::Explicit {
                    record.origin = DomainOrigin::Explicit;
                    record.description = description;
                }
                false
            }
            None => {
                self.records.insert(
                    key.clone(),
                    DomainRecord {
                        hostname: key,
                        description,
                        last_known_ip: None,
                        origin,
                    },
                );
                true
            }
        }
    }

    /// Remove a hostname, returning its record
    pub fn remove(&mut self, hostname: &str) -> Option<DomainRecord> {
        self.records.remove(&normalize_hostname(hostname))
    }

    /// Record a freshly resolved address
    ///
    /// Returns the previous address. Unknown hostnames are ignored.
    pub fn set_last_known_ip(&mut self, hostname: &str, ip: Ipv4Addr) -> Option<Ipv4Addr> {
        self.records
            .get_mut(&normalize_hostname(hostname))
            .and_then(|record| record.last_known_ip.replace(ip))
    }

    /// Look up one record
    pub fn get(&self, hostname: &str) -> Option<&DomainRecord> {
        self.records.get(&normalize_hostname(hostname))
    }

    /// Whether a hostname is monitored
    pub fn contains(&self, hostname: &str) -> bool {
        self.records.contains_key(&normalize_hostname(hostname))
    }

    /// Consistent copy of every record, ordered by hostname
    pub fn snapshot(&self) -> Vec<DomainRecord> {
        self.records.values().cloned().collect()
    }

    /// Hostnames of a given origin
    pub fn hostnames_with_origin(&self, origin: DomainOrigin) -> Vec<String> {
        self.records
            .values()
            .filter(|record| record.origin == origin)
            .map(|record| record.hostname.clone())
            .collect()
    }

    /// Number of monitored hostnames
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
