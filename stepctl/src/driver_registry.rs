//! Driver registry for stepper drivers.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving driver
//! factories. The registry is built at startup and handed to the dispatcher.

use crate::drivers::register_builtin_drivers;
use std::collections::HashMap;
use stepctl_common::config::DriverConfig;
use stepctl_common::driver::{DriverError, DriverFactory, StepperDriver};

/// Registry of available stepper drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in driver.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        register_builtin_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create the driver named in `config`.
    ///
    /// # Errors
    /// Returns `DriverError::DriverNotFound` if no driver with that name is registered.
    pub fn create_driver(
        &self,
        config: &DriverConfig,
    ) -> Result<Box<dyn StepperDriver>, DriverError> {
        let factory = self
            .get_factory(&config.name)
            .ok_or_else(|| DriverError::DriverNotFound(config.name.clone()))?;
        Ok(factory(config))
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
