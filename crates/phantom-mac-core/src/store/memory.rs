// # Memory Backup Store
//
// In-memory implementation of BackupStore.
//
// ## Purpose
//
// Same record semantics as the file store with nothing written to disk.
// Useful for tests and for embedding the orchestrator where persistence is
// handled elsewhere.
//
// ## Crash Behavior
//
// - All records are lost when the process exits
// - `load()` returns the current in-memory set

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::address::MacAddress;
use crate::traits::backup_store::{Backed, BackupRecord, BackupRecords, BackupStore};

/// In-memory backup store implementation
///
/// Clones share the same underlying set, so a test can keep a handle while
/// the orchestrator owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackupStore {
    inner: Arc<RwLock<BackupRecords>>,
}

impl MemoryBackupStore {
    /// Create a new empty memory store
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
impl BackupStore for MemoryBackupStore {
    async fn load(&self) -> Result<BackupRecords, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self) -> Result<(), Error> {
        // No-op for memory store (everything is already "persisted")
        Ok(())
    }

    async fn records(&self) -> BackupRecords {
        self.inner.read().await.clone()
    }

    async fn original(&self, interface: &str) -> Option<MacAddress> {
        self.inner.read().await.get(interface).map(|r| r.original)
    }

    async fn ensure_backed(&self, interface: &str, current: MacAddress) -> Result<Backed, Error> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(interface) {
            return Ok(Backed::AlreadyPresent);
        }
        guard.insert(interface.to_string(), BackupRecord::new(current));
        Ok(Backed::Inserted)
    }

    async fn take_and_clear(&self, interface: &str) -> Result<Option<MacAddress>, Error> {
        let mut guard = self.inner.write().await;
        Ok(guard.remove(interface).map(|r| r.original))
    }
}
