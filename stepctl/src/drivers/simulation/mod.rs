//! Simulation driver module.
//!
//! This module provides a software stepper board for development and
//! testing without physical hardware.

mod driver;
mod physics;

pub use driver::SimulationDriver;
pub use physics::AxisSimulator;

use stepctl_common::config::DriverConfig;
use stepctl_common::driver::StepperDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver(config: &DriverConfig) -> Box<dyn StepperDriver> {
    Box::new(SimulationDriver::new(config.simulation.clone()))
}
