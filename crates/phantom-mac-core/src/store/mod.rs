// # Backup Store Implementations
//
// This module provides implementations of the BackupStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileBackupStore;
pub use memory::MemoryBackupStore;
