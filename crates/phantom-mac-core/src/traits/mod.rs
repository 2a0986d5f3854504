//! Core traits for phantom-mac
//!
//! This module defines the abstract interfaces the orchestrator drives.
//!
//! - [`NetworkController`]: Per-OS interface inspection and mutation
//! - [`BackupStore`]: Persistent record of original addresses
//! - [`Confirmation`]: Operator approval for disruptive steps

pub mod backup_store;
pub mod confirmation;
pub mod network_controller;

pub use backup_store::{Backed, BackupRecord, BackupRecords, BackupStore};
pub use confirmation::{Confirmation, FixedConfirmation, is_affirmative};
pub use network_controller::{ControllerFactory, HostFamily, NetworkController};
