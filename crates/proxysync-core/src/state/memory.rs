// # Memory State Store
//
// In-memory implementation of StateStore.
//
// All state is lost on restart. The first pass after a restart records
// every resolved address as new; stale literals left by a DNS change during
// the downtime are then only caught by the heuristic drift policy.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{StateRecord, StateStore};

/// In-memory state store implementation
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<HashMap<String, StateRecord>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_last_ip(&self, hostname: &str) -> Result<Option<Ipv4Addr>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(hostname).map(|record| record.last_ip))
    }

    async fn set_last_ip(&self, hostname: &str, ip: Ipv4Addr) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(hostname.to_string(), StateRecord::new(ip));
        Ok(())
    }

    async fn delete_record(&self, hostname: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(hostname);
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<(String, StateRecord)>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .iter()
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
