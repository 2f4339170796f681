//! Stepper driver implementations.
//!
//! - [`simulation`] - Software simulation driver for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `StepperDriver` trait from `stepctl_common::driver`
//! 3. Register the driver in [`register_builtin_drivers`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers into `registry`.
pub fn register_builtin_drivers(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_driver);
}
