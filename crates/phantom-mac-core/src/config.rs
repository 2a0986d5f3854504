//! Configuration types for phantom-mac
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main phantom-mac configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhantomConfig {
    /// Backup store configuration
    #[serde(default)]
    pub backup: BackupConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Platform controller settings
    #[serde(default)]
    pub platform: PlatformConfig,
}

impl PhantomConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.backup.validate()?;
        self.orchestrator.validate()?;
        self.platform.validate()?;
        Ok(())
    }
}

/// Backup store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Path to the backup file
    #[serde(default = "default_backup_path")]
    pub path: PathBuf,
}

impl BackupConfig {
    /// Validate the backup configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.path.as_os_str().is_empty() {
            return Err(crate::Error::config("Backup path cannot be empty"));
        }
        if self.path.is_dir() {
            return Err(crate::Error::config(format!(
                "Backup path {} is a directory",
                self.path.display()
            )));
        }
        Ok(())
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            path: default_backup_path(),
        }
    }
}

/// Default location of the backup file for this host
pub fn default_backup_path() -> PathBuf {
    if cfg!(windows) {
        let base = std::env::var_os("ProgramData")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"));
        base.join("phantom-mac").join("backup.json")
    } else {
        PathBuf::from("/var/lib/phantom-mac/backup.json")
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Waits inserted between interface state changes
    #[serde(default)]
    pub settle: SettleDelays,

    /// Timeout for the post-change reachability probe (in seconds)
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Capacity of the state transition event channel
    ///
    /// When full, further events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl OrchestratorConfig {
    /// Validate the orchestrator configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=60).contains(&self.probe_timeout_secs) {
            return Err(crate::Error::config(format!(
                "Probe timeout must be between 1 and 60 seconds. Got: {}",
                self.probe_timeout_secs
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        self.settle.validate()
    }

    /// Probe timeout as a Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settle: SettleDelays::default(),
            probe_timeout_secs: default_probe_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Fixed waits that let the OS apply an interface change
///
/// These stand in for polling the actual interface state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleDelays {
    /// After bringing the interface down (milliseconds)
    #[serde(default = "default_after_down_ms")]
    pub after_down_ms: u64,

    /// After writing a new address during a change (milliseconds)
    #[serde(default = "default_after_mutation_ms")]
    pub after_mutation_ms: u64,

    /// After bringing the interface up during a change (milliseconds)
    #[serde(default = "default_after_up_ms")]
    pub after_up_ms: u64,

    /// After bringing the interface up during a restore (milliseconds)
    #[serde(default = "default_restore_after_up_ms")]
    pub restore_after_up_ms: u64,
}

/// Upper bound for any single settle delay
const MAX_SETTLE_MS: u64 = 60_000;

impl SettleDelays {
    /// No waiting at all (tests, fakes)
    pub const fn none() -> Self {
        Self {
            after_down_ms: 0,
            after_mutation_ms: 0,
            after_up_ms: 0,
            restore_after_up_ms: 0,
        }
    }

    /// Validate every delay against the upper bound
    pub fn validate(&self) -> Result<(), crate::Error> {
        for (name, value) in [
            ("after_down_ms", self.after_down_ms),
            ("after_mutation_ms", self.after_mutation_ms),
            ("after_up_ms", self.after_up_ms),
            ("restore_after_up_ms", self.restore_after_up_ms),
        ] {
            if value > MAX_SETTLE_MS {
                return Err(crate::Error::config(format!(
                    "Settle delay {} must be at most {} ms. Got: {}",
                    name, MAX_SETTLE_MS, value
                )));
            }
        }
        Ok(())
    }

    pub fn after_down(&self) -> Duration {
        Duration::from_millis(self.after_down_ms)
    }

    pub fn after_mutation(&self) -> Duration {
        Duration::from_millis(self.after_mutation_ms)
    }

    pub fn after_up(&self) -> Duration {
        Duration::from_millis(self.after_up_ms)
    }

    pub fn restore_after_up(&self) -> Duration {
        Duration::from_millis(self.restore_after_up_ms)
    }
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            after_down_ms: default_after_down_ms(),
            after_mutation_ms: default_after_mutation_ms(),
            after_up_ms: default_after_up_ms(),
            restore_after_up_ms: default_restore_after_up_ms(),
        }
    }
}

/// Platform controller configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Windows only: adapter subkey under the network class key (e.g. "0007")
    ///
    /// When unset the subkey is discovered from the adapter's GUID.
    #[serde(default)]
    pub adapter_subkey: Option<String>,
}

impl PlatformConfig {
    /// Validate the platform configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let Some(subkey) = &self.adapter_subkey
            && (subkey.len() != 4 || !subkey.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(crate::Error::config(format!(
                "Adapter subkey must be four digits (e.g. 0007). Got: {}",
                subkey
            )));
        }
        Ok(())
    }
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    64
}

fn default_after_down_ms() -> u64 {
    2000
}

fn default_after_mutation_ms() -> u64 {
    1000
}

fn default_after_up_ms() -> u64 {
    3000
}

fn default_restore_after_up_ms() -> u64 {
    2000
}
