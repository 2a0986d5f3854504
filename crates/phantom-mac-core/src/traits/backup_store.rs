// # Backup Store Trait
//
// Defines the interface for remembering each interface's original address.
//
// ## Purpose
//
// The backup store makes restores possible across process runs by tracking:
// - The address observed before the first mutation of each interface
// - When that address was recorded
//
// ## Lifecycle of a record
//
// - Created the first time an interface is mutated and no record exists
// - Never overwritten by later changes (first write wins)
// - Removed only after a restore completes successfully
//
// ## Implementations
//
// - File-based: versioned JSON file with atomic writes
// - Memory: no persistence, for tests and fakes

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::address::MacAddress;

/// Original address of one interface
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BackupRecord {
    /// Address observed before the first mutation
    pub original: MacAddress,
    /// When the address was recorded
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl BackupRecord {
    /// Create a record stamped with the current time
    ///
    /// # Visibility
    ///
    /// This is `pub(crate)` so records only originate from
    /// [`BackupStore::ensure_backed`] implementations and file loading.
    pub(crate) fn new(original: MacAddress) -> Self {
        Self {
            original,
            recorded_at: chrono::Utc::now(),
        }
    }
}

/// All records, keyed by interface name
pub type BackupRecords = BTreeMap<String, BackupRecord>;

/// Outcome of [`BackupStore::ensure_backed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backed {
    /// A new record was created
    Inserted,
    /// A record already existed and was left untouched
    AlreadyPresent,
}

/// Trait for backup store implementations
///
/// The in-memory set is authoritative for the current process run. Every
/// mutating method persists immediately; a failed write leaves the
/// in-memory change in place and returns the error so the caller can
/// downgrade it to a warning.
///
/// # Concurrency
///
/// Implementations guard their in-memory set, but no cross-process locking
/// is performed. Two invocations of the tool racing on one file is an
/// unguarded condition.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Re-read persisted state, replacing the in-memory set
    ///
    /// A missing or unparsable file yields an empty set rather than an
    /// error. Other I/O failures are returned and leave the in-memory set
    /// untouched.
    async fn load(&self) -> Result<BackupRecords, crate::Error>;

    /// Persist the full in-memory set
    async fn save(&self) -> Result<(), crate::Error>;

    /// Snapshot of the in-memory set
    async fn records(&self) -> BackupRecords;

    /// Recorded original address for an interface
    async fn original(&self, interface: &str) -> Option<MacAddress>;

    /// Record `current` as the original for `interface` unless one exists
    ///
    /// # Returns
    ///
    /// - `Ok(Backed::Inserted)`: New record created and persisted
    /// - `Ok(Backed::AlreadyPresent)`: Existing record preserved
    /// - `Err(Error)`: Record kept in memory but persisting failed
    async fn ensure_backed(
        &self,
        interface: &str,
        current: MacAddress,
    ) -> Result<Backed, crate::Error>;

    /// Remove and return the record for an interface, then persist
    ///
    /// # Returns
    ///
    /// - `Ok(Some(MacAddress))`: The removed original address
    /// - `Ok(None)`: No record existed
    /// - `Err(Error)`: Record removed in memory but persisting failed
    async fn take_and_clear(&self, interface: &str) -> Result<Option<MacAddress>, crate::Error>;
}
