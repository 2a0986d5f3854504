//! Error types for phantom-mac
//!
//! This module defines all error types used throughout the crate, plus the
//! non-fatal [`Warning`]s that successful operations carry back to the caller.

use std::fmt;
use std::net::IpAddr;

use thiserror::Error;

/// Result type alias for phantom-mac operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for phantom-mac
#[derive(Error, Debug)]
pub enum Error {
    /// The requested address is malformed or not assignable
    #[error("Invalid MAC address: {address}")]
    InvalidAddress {
        /// The rejected input, verbatim
        address: String,
    },

    /// The process lacks administrative rights
    #[error("Administrative privileges are required")]
    PrivilegeRequired,

    /// Bringing the interface down failed
    #[error("Failed to bring interface {interface} down")]
    InterfaceDownFailed {
        /// Interface name
        interface: String,
    },

    /// Writing the new address failed
    #[error("Failed to set address {address} on interface {interface}")]
    AddressMutationFailed {
        /// Interface name
        interface: String,
        /// Address that could not be applied
        address: String,
    },

    /// Bringing the interface back up failed
    #[error("Failed to bring interface {interface} up")]
    InterfaceUpFailed {
        /// Interface name
        interface: String,
    },

    /// No original address has been recorded for the interface
    #[error("No original MAC address backup found for {interface}")]
    NoBackupFound {
        /// Interface name
        interface: String,
    },

    /// The operator declined the confirmation prompt
    #[error("Operation on {interface} cancelled by user")]
    CancelledByUser {
        /// Interface name
        interface: String,
    },

    /// The host OS has no controller
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backup store errors
    #[error("Backup store error: {0}")]
    BackupStore(String),

    /// External command errors (spawn failure, non-zero exit, timeout)
    #[error("Command error: {0}")]
    Command(String),
}

impl Error {
    /// Create an invalid address error
    pub fn invalid_address(address: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a backup store error
    pub fn backup_store(msg: impl Into<String>) -> Self {
        Self::BackupStore(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Whether a best-effort `up` should follow this error
    ///
    /// Only a failed address write leaves the interface down behind a
    /// successful `down`. A failed `down` changed nothing, and a failed `up`
    /// comes after the address was already written.
    pub fn needs_recovery(&self) -> bool {
        matches!(self, Self::AddressMutationFailed { .. })
    }
}

/// Non-fatal condition observed while an operation still succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The post-change reachability probe failed
    Connectivity {
        /// Probed gateway
        gateway: IpAddr,
    },

    /// Loading or saving the backup file failed
    Persistence {
        /// Underlying failure
        message: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Connectivity { gateway } => {
                write!(f, "Network connectivity test to {} failed", gateway)
            }
            Warning::Persistence { message } => {
                write!(f, "Backup persistence failed: {}", message)
            }
        }
    }
}
