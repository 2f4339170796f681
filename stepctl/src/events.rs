//! Tracing event sink.
//!
//! Production implementation of `DriverEvents`: lifecycle events at info,
//! device errors at error, telemetry at debug.

use stepctl_common::driver::{DeviceInfo, DriverEvents};
use tracing::{debug, error, info};

/// Logs every driver event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl DriverEvents for TracingEvents {
    fn on_attach(&self, device: &DeviceInfo) {
        info!("Stepper {} attached", device.serial_number);
    }

    fn on_detach(&self, device: &DeviceInfo) {
        info!("Stepper {} detached", device.serial_number);
    }

    fn on_error(&self, serial_number: i32, code: i32, description: &str) {
        error!("Stepper {}: device error {}: {}", serial_number, code, description);
    }

    fn on_current_change(&self, serial_number: i32, motor: usize, current: f64) {
        debug!(
            "Stepper {}: motor {} current draw {:.6} A",
            serial_number, motor, current
        );
    }

    fn on_input_change(&self, serial_number: i32, input: usize, state: bool) {
        debug!("Stepper {}: input {} state {}", serial_number, input, state);
    }

    fn on_position_change(&self, serial_number: i32, motor: usize, position: i64) {
        debug!(
            "Stepper {}: motor {} position {}",
            serial_number, motor, position
        );
    }

    fn on_velocity_change(&self, serial_number: i32, motor: usize, velocity: f64) {
        debug!(
            "Stepper {}: motor {} velocity {:.3}",
            serial_number, motor, velocity
        );
    }
}

/// Log the identification block of an attached device.
pub fn log_device_info(device: &DeviceInfo) {
    info!(
        attached = device.attached,
        name = %device.name,
        serial = device.serial_number,
        version = device.version,
        "Device attached"
    );
    info!("Number of motors: {}", device.motor_count);
}
