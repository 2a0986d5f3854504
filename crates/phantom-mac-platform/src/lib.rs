// # Platform Network Controllers
//
// This crate provides the per-OS implementations of `NetworkController`.
//
// ## Implementation
//
// Each controller drives the host's own tools rather than OS APIs:
// - Linux: `ip link`, `ip route`, `ping`
// - macOS: `ifconfig`, `netstat`, `ping`
// - Windows: `netsh`, `reg`, `getmac`, `ipconfig`, `ping`
//
// Commands run through a `CommandRunner`, so each controller's argument
// construction and output parsing is tested with scripted output on any
// host.
//
// ## Error Model
//
// Spawn failures, non-zero exits and unparsable output are logged and
// reported as `false`/`None`. Raw OS errors never reach the orchestrator.

pub mod command;
pub mod linux;
pub mod macos;
pub mod windows;

pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use linux::LinuxController;
pub use macos::MacosController;
pub use windows::WindowsController;

use phantom_mac_core::config::PlatformConfig;
use phantom_mac_core::registry::ControllerRegistry;
use phantom_mac_core::traits::{ControllerFactory, HostFamily, NetworkController};
use phantom_mac_core::Result;

/// Factory for creating Linux controllers
pub struct LinuxControllerFactory;

impl ControllerFactory for LinuxControllerFactory {
    fn create(&self, _config: &PlatformConfig) -> Result<Box<dyn NetworkController>> {
        Ok(Box::new(LinuxController::new()))
    }
}

/// Factory for creating macOS controllers
pub struct MacosControllerFactory;

impl ControllerFactory for MacosControllerFactory {
    fn create(&self, _config: &PlatformConfig) -> Result<Box<dyn NetworkController>> {
        Ok(Box::new(MacosController::new()))
    }
}

/// Factory for creating Windows controllers
pub struct WindowsControllerFactory;

impl ControllerFactory for WindowsControllerFactory {
    fn create(&self, config: &PlatformConfig) -> Result<Box<dyn NetworkController>> {
        config.validate()?;
        Ok(Box::new(WindowsController::new(config.adapter_subkey.clone())))
    }
}

/// Register every platform controller with the registry
///
/// # Example
///
/// ```rust,no_run
/// use phantom_mac_core::ControllerRegistry;
///
/// let registry = ControllerRegistry::new();
/// phantom_mac_platform::register(&registry);
/// ```
pub fn register(registry: &ControllerRegistry) {
    registry.register_controller(HostFamily::Linux, Box::new(LinuxControllerFactory));
    registry.register_controller(HostFamily::Macos, Box::new(MacosControllerFactory));
    registry.register_controller(HostFamily::Windows, Box::new(WindowsControllerFactory));
}

/// Whether the process runs with an effective UID of 0
#[cfg(unix)]
pub(crate) fn effective_user_is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub(crate) fn effective_user_is_root() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_all_families() {
        let registry = ControllerRegistry::new();
        register(&registry);

        for family in [HostFamily::Linux, HostFamily::Macos, HostFamily::Windows] {
            assert!(registry.has_controller(family));
            let controller = registry
                .create_controller(family, &PlatformConfig::default())
                .unwrap();
            assert_eq!(controller.family(), family);
        }
        assert_eq!(registry.list_controllers().len(), 3);
    }

    #[test]
    fn test_windows_factory_rejects_bad_subkey() {
        let config = PlatformConfig {
            adapter_subkey: Some("abc".to_string()),
        };
        assert!(WindowsControllerFactory.create(&config).is_err());
    }
}
