// # Network Controller Trait
//
// Defines the capability interface for inspecting and mutating a network
// interface's link-layer state.
//
// ## Implementations
//
// - Linux (`ip`, `ping`), macOS (`ifconfig`, `netstat`), Windows (`netsh`,
//   `reg`, `getmac`, `ipconfig`): `phantom-mac-platform` crate
// - Test doubles: `tests/common/mod.rs`
//
// ## Usage
//
// ```rust,ignore
// use phantom_mac_core::NetworkController;
//
// async fn show(controller: &dyn NetworkController) {
//     match controller.current_address("eth0").await {
//         Some(mac) => println!("eth0: {}", mac),
//         None => println!("eth0: unknown"),
//     }
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::address::MacAddress;
use crate::config::PlatformConfig;

/// Operating system family a controller targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostFamily {
    Windows,
    Macos,
    Linux,
}

impl HostFamily {
    /// Identify the family of the running host
    ///
    /// # Returns
    ///
    /// - `Ok(HostFamily)`: One of the supported families
    /// - `Err(Error::UnsupportedPlatform)`: Any other OS
    pub fn detect() -> Result<Self, crate::Error> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value to a family
    pub fn from_os(os: &str) -> Result<Self, crate::Error> {
        match os {
            "windows" => Ok(HostFamily::Windows),
            "macos" => Ok(HostFamily::Macos),
            "linux" => Ok(HostFamily::Linux),
            other => Err(crate::Error::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Lowercase family name
    pub fn as_str(&self) -> &'static str {
        match self {
            HostFamily::Windows => "windows",
            HostFamily::Macos => "macos",
            HostFamily::Linux => "linux",
        }
    }
}

impl fmt::Display for HostFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for platform network controllers
///
/// Every method is a soft operation: command failures, non-zero exit codes
/// and unparsable output are logged by the implementation and reported as
/// `false` or `None`. Raw OS error text never crosses this boundary.
///
/// # Sequencing
///
/// Implementations do not wait for the OS to settle. The
/// [`ChangeOrchestrator`](crate::ChangeOrchestrator) owns ordering and
/// settle delays between calls.
#[async_trait]
pub trait NetworkController: Send + Sync {
    /// The family this controller drives
    fn family(&self) -> HostFamily;

    /// Whether the process runs with administrative rights
    async fn check_privileges(&self) -> bool;

    /// Read the interface's current hardware address
    ///
    /// # Returns
    ///
    /// - `Some(MacAddress)`: The address reported by the OS
    /// - `None`: Command failed or output could not be parsed
    async fn current_address(&self, interface: &str) -> Option<MacAddress>;

    /// Toggle the administrative state of the interface
    async fn set_interface_up(&self, interface: &str, up: bool) -> bool;

    /// Apply a new hardware address
    ///
    /// Some platforms bracket the write with their own down/up cycle.
    async fn set_address(&self, interface: &str, address: &MacAddress) -> bool;

    /// Default route gateway, if one can be determined
    async fn default_gateway(&self) -> Option<IpAddr>;

    /// Send a single reachability probe bounded by `timeout`
    async fn test_connectivity(&self, host: IpAddr, timeout: Duration) -> bool;
}

/// Helper trait for constructing controllers from configuration
pub trait ControllerFactory: Send + Sync {
    /// Create a NetworkController instance
    ///
    /// # Parameters
    ///
    /// - `config`: Platform-specific settings
    ///
    /// # Returns
    ///
    /// A boxed NetworkController trait object
    fn create(&self, config: &PlatformConfig) -> Result<Box<dyn NetworkController>, crate::Error>;
}
