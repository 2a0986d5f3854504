//! Plugin-based controller registry
//!
//! The registry maps each host family to a controller factory so the binary
//! selects one implementation at startup, with no OS checks scattered
//! through business logic.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use phantom_mac_core::registry::ControllerRegistry;
//! use phantom_mac_core::config::PlatformConfig;
//!
//! let registry = ControllerRegistry::new();
//! phantom_mac_platform::register(&registry);
//!
//! let controller = registry.create_for_host(&PlatformConfig::default())?;
//! ```

use crate::config::PlatformConfig;
use crate::error::{Error, Result};
use crate::traits::{ControllerFactory, HostFamily, NetworkController};
use std::collections::HashMap;
use std::sync::RwLock;

/// Controller registry for plugin-based controller creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ControllerRegistry {
    /// Registered controller factories
    controllers: RwLock<HashMap<HostFamily, Box<dyn ControllerFactory>>>,
}

impl ControllerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller factory for a host family
    ///
    /// Registering a family twice replaces the earlier factory.
    pub fn register_controller(&self, family: HostFamily, factory: Box<dyn ControllerFactory>) {
        let mut controllers = self.controllers.write().unwrap();
        controllers.insert(family, factory);
    }

    /// Create a controller for an explicit family
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn NetworkController>)`: Created controller
    /// - `Err(Error)`: If no factory is registered or creation fails
    pub fn create_controller(
        &self,
        family: HostFamily,
        config: &PlatformConfig,
    ) -> Result<Box<dyn NetworkController>> {
        let controllers = self.controllers.read().unwrap();

        let factory = controllers.get(&family).ok_or_else(|| {
            Error::UnsupportedPlatform(format!("no controller registered for {}", family))
        })?;

        factory.create(config)
    }

    /// Detect the host family and create its controller
    pub fn create_for_host(&self, config: &PlatformConfig) -> Result<Box<dyn NetworkController>> {
        let family = HostFamily::detect()?;
        tracing::debug!("Detected host family: {}", family);
        self.create_controller(family, config)
    }

    /// List all registered families
    pub fn list_controllers(&self) -> Vec<HostFamily> {
        let controllers = self.controllers.read().unwrap();
        controllers.keys().copied().collect()
    }

    /// Check if a family has a registered factory
    pub fn has_controller(&self, family: HostFamily) -> bool {
        let controllers = self.controllers.read().unwrap();
        controllers.contains_key(&family)
    }
}
