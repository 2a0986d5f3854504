// # File Backup Store
//
// File-based implementation of BackupStore with crash recovery.
//
// ## Purpose
//
// Keeps each interface's original address across process runs so that a
// later `--restore` invocation can put it back.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Automatic backup: Keeps `<path>.backup` of the last known good file
// - Recovery: Falls back to the backup copy if the main file is corrupted
// - Missing or unrecoverable files load as an empty set
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "records": {
//     "eth0": {
//       "original": "aa:bb:cc:dd:ee:ff",
//       "recorded_at": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```
//
// The flat `{"eth0": "AA:BB:CC:DD:EE:FF"}` layout written by earlier
// versions of the tool is still accepted on load.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::address::MacAddress;
use crate::traits::backup_store::{Backed, BackupRecord, BackupRecords, BackupStore};

/// Backup file format version
const BACKUP_FILE_VERSION: &str = "1.0";

/// File-based backup store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use phantom_mac_core::store::FileBackupStore;
/// use phantom_mac_core::traits::BackupStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileBackupStore::open("/var/lib/phantom-mac/backup.json").await;
///
///     // Record the original (atomically written to disk)
///     store.ensure_backed("eth0", "aa:bb:cc:dd:ee:ff".parse()?).await?;
///
///     assert_eq!(store.original("eth0").await, Some("aa:bb:cc:dd:ee:ff".parse()?));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileBackupStore {
    path: PathBuf,
    records: RwLock<BackupRecords>,
}

/// Serializable backup file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct BackupFileFormat {
    version: String,
    records: BackupRecords,
}

/// Any layout the loader understands
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum StoredLayout {
    Versioned(BackupFileFormat),
    Legacy(BTreeMap<String, MacAddress>),
}

/// Why a file could not be read
#[derive(Debug)]
enum ReadFailure {
    Io(std::io::Error),
    Corrupt(serde_json::Error),
}

impl FileBackupStore {
    /// Open a store, loading whatever is on disk
    ///
    /// This never fails: a missing file starts empty, a corrupted file is
    /// recovered from its `.backup` copy when possible, and unreadable files
    /// are logged and treated as empty. Parent directories are created on
    /// the first save.
    pub async fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let records = match Self::load_with_recovery(&path).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Starting with empty backup set: {}", e);
                BackupRecords::new()
            }
        };

        Self {
            path,
            records: RwLock::new(records),
        }
    }

    /// Location of the backup file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load records with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load the main file
    /// 2. If it is corrupted, try the `.backup` copy and restore it
    /// 3. If both fail, start with an empty set
    async fn load_with_recovery(path: &Path) -> Result<BackupRecords, Error> {
        match Self::read_records(path).await {
            Ok(records) => {
                tracing::debug!("Loaded backup file: {} records", records.len());
                Ok(records)
            }
            Err(ReadFailure::Io(e)) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Backup file does not exist: {}", path.display());
                Ok(BackupRecords::new())
            }
            Err(ReadFailure::Io(e)) => Err(Error::backup_store(format!(
                "Failed to read backup file {}: {}",
                path.display(),
                e
            ))),
            Err(ReadFailure::Corrupt(e)) => {
                tracing::warn!(
                    "Backup file {} appears corrupted: {}. Attempting recovery.",
                    path.display(),
                    e
                );

                let copy_path = Self::copy_path(path);
                match Self::read_records(&copy_path).await {
                    Ok(records) => {
                        tracing::info!("Recovered {} records from {}", records.len(), copy_path.display());
                        if let Err(e) = fs::copy(&copy_path, path).await {
                            tracing::error!("Failed to restore backup file from copy: {}", e);
                        }
                        Ok(records)
                    }
                    Err(_) => {
                        tracing::warn!("No usable backup copy. Starting with empty set.");
                        Ok(BackupRecords::new())
                    }
                }
            }
        }
    }

    /// Read and parse one file
    async fn read_records(path: &Path) -> Result<BackupRecords, ReadFailure> {
        let content = fs::read_to_string(path).await.map_err(ReadFailure::Io)?;

        let layout: StoredLayout = serde_json::from_str(&content).map_err(ReadFailure::Corrupt)?;
        match layout {
            StoredLayout::Versioned(file) => {
                if file.version != BACKUP_FILE_VERSION {
                    tracing::warn!(
                        "Backup file version mismatch: expected {}, got {}. Attempting to load anyway.",
                        BACKUP_FILE_VERSION,
                        file.version
                    );
                }
                Ok(file.records)
            }
            StoredLayout::Legacy(flat) => {
                tracing::info!("Converting legacy backup layout ({} records)", flat.len());
                Ok(flat
                    .into_iter()
                    .map(|(interface, mac)| (interface, BackupRecord::new(mac)))
                    .collect())
            }
        }
    }

    /// Write records to file atomically
    async fn write_records(&self, records: BackupRecords) -> Result<(), Error> {
        let file = BackupFileFormat {
            version: BACKUP_FILE_VERSION.to_string(),
            records,
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::backup_store(format!("Failed to serialize backup set: {}", e)))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::backup_store(format!(
                    "Failed to create backup directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        // Write to temporary file first
        let temp_path = Self::temp_path(&self.path);
        {
            let mut out = fs::File::create(&temp_path).await.map_err(|e| {
                Error::backup_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.write_all(json.as_bytes()).await.map_err(|e| {
                Error::backup_store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.flush().await.map_err(|e| {
                Error::backup_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Keep the previous good file around for recovery
        if fs::try_exists(&self.path).await.unwrap_or(false)
            && let Err(e) = fs::copy(&self.path, Self::copy_path(&self.path)).await
        {
            tracing::warn!("Failed to create backup copy: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::backup_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Backup file written: {}", self.path.display());
        Ok(())
    }

    fn temp_path(path: &Path) -> PathBuf {
        Self::with_suffix(path, ".tmp")
    }

    fn copy_path(path: &Path) -> PathBuf {
        Self::with_suffix(path, ".backup")
    }

    fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    }
}

#[async_trait]
impl BackupStore for FileBackupStore {
    async fn load(&self) -> Result<BackupRecords, Error> {
        let loaded = Self::load_with_recovery(&self.path).await?;
        *self.records.write().await = loaded.clone();
        Ok(loaded)
    }

    async fn save(&self) -> Result<(), Error> {
        let snapshot = self.records.read().await.clone();
        self.write_records(snapshot).await
    }

    async fn records(&self) -> BackupRecords {
        self.records.read().await.clone()
    }

    async fn original(&self, interface: &str) -> Option<MacAddress> {
        self.records.read().await.get(interface).map(|r| r.original)
    }

    async fn ensure_backed(&self, interface: &str, current: MacAddress) -> Result<Backed, Error> {
        {
            let mut guard = self.records.write().await;
            if guard.contains_key(interface) {
                return Ok(Backed::AlreadyPresent);
            }
            guard.insert(interface.to_string(), BackupRecord::new(current));
        }

        // Immediate write for durability
        self.save().await?;
        Ok(Backed::Inserted)
    }

    async fn take_and_clear(&self, interface: &str) -> Result<Option<MacAddress>, Error> {
        let removed = self.records.write().await.remove(interface);
        if removed.is_some() {
            self.save().await?;
        }
        Ok(removed.map(|r| r.original))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mac(s: &str) -> MacAddress {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_file_store_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("backup.json");

        let store = FileBackupStore::open(&path).await;
        assert!(store.records().await.is_empty());

        let backed = store
            .ensure_backed("eth0", mac("AA:BB:CC:DD:EE:FF"))
            .await
            .unwrap();
        assert_eq!(backed, Backed::Inserted);
        assert!(path.exists());

        // Load new instance and verify persistence
        let store2 = FileBackupStore::open(&path).await;
        assert_eq!(store2.original("eth0").await, Some(mac("aa:bb:cc:dd:ee:ff")));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"version\": \"1.0\""));
        assert!(content.contains("\"original\": \"aa:bb:cc:dd:ee:ff\""));
    }

    #[tokio::test]
    async fn test_file_store_first_write_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let store = FileBackupStore::open(&path).await;

        store.ensure_backed("eth0", mac("aa:bb:cc:dd:ee:ff")).await.unwrap();
        let second = store
            .ensure_backed("eth0", mac("00:11:22:33:44:55"))
            .await
            .unwrap();
        assert_eq!(second, Backed::AlreadyPresent);

        let reopened = FileBackupStore::open(&path).await;
        assert_eq!(reopened.original("eth0").await, Some(mac("aa:bb:cc:dd:ee:ff")));
    }

    #[tokio::test]
    async fn test_file_store_take_and_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let store = FileBackupStore::open(&path).await;

        store.ensure_backed("eth0", mac("aa:bb:cc:dd:ee:ff")).await.unwrap();
        store.ensure_backed("wlan0", mac("02:00:00:00:00:01")).await.unwrap();

        let taken = store.take_and_clear("eth0").await.unwrap();
        assert_eq!(taken, Some(mac("aa:bb:cc:dd:ee:ff")));
        assert_eq!(store.take_and_clear("eth0").await.unwrap(), None);

        let reopened = FileBackupStore::open(&path).await;
        let records = reopened.records().await;
        assert_eq!(records.len(), 1);
        assert!(records.contains_key("wlan0"));
    }

    #[tokio::test]
    async fn test_file_store_load_sees_other_writers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");

        let reader = FileBackupStore::open(&path).await;
        let writer = FileBackupStore::open(&path).await;
        writer.ensure_backed("eth0", mac("aa:bb:cc:dd:ee:ff")).await.unwrap();

        assert_eq!(reader.original("eth0").await, None);
        let loaded = reader.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(reader.original("eth0").await, Some(mac("aa:bb:cc:dd:ee:ff")));
    }

    #[tokio::test]
    async fn test_file_store_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");

        let store = FileBackupStore::open(&path).await;
        store.ensure_backed("eth0", mac("aa:bb:cc:dd:ee:ff")).await.unwrap();
        // Second write makes the copy hold the first state
        store.ensure_backed("wlan0", mac("02:00:00:00:00:01")).await.unwrap();

        let copy_path = FileBackupStore::copy_path(&path);
        assert!(copy_path.exists(), "Backup copy should exist after second write");

        std::fs::write(&path, b"corrupted json data").unwrap();

        let recovered = FileBackupStore::open(&path).await;
        let records = recovered.records().await;
        assert_eq!(records.len(), 1, "Copy holds the state before the last write");
        assert_eq!(recovered.original("eth0").await, Some(mac("aa:bb:cc:dd:ee:ff")));

        // Main file was restored from the copy
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("eth0"));
    }

    #[tokio::test]
    async fn test_file_store_corrupt_without_copy_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("backup.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = FileBackupStore::open(&path).await;
        assert!(store.records().await.is_empty());
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_reads_legacy_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mac_backup.json");
        std::fs::write(&path, br#"{ "eth0": "AA:BB:CC:DD:EE:FF", "en0": "00-0c-29-01-02-03" }"#)
            .unwrap();

        let store = FileBackupStore::open(&path).await;
        assert_eq!(store.original("eth0").await, Some(mac("aa:bb:cc:dd:ee:ff")));
        assert_eq!(store.original("en0").await, Some(mac("00:0c:29:01:02:03")));

        // Next save upgrades the layout
        store.take_and_clear("en0").await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"version\""));
    }

    #[tokio::test]
    async fn test_file_store_write_failure_keeps_memory() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"regular file").unwrap();
        let path = blocker.join("backup.json");

        let store = FileBackupStore::open(&path).await;
        let result = store.ensure_backed("eth0", mac("aa:bb:cc:dd:ee:ff")).await;
        assert!(matches!(result, Err(Error::BackupStore(_))));
        assert_eq!(store.original("eth0").await, Some(mac("aa:bb:cc:dd:ee:ff")));
    }
}
