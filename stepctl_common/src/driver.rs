//! Stepper driver trait, event sink and error types.
//!
//! This module defines:
//! - `StepperDriver` trait - Interface for pluggable stepper controller boards
//! - `DriverEvents` trait - Sink for asynchronous lifecycle and telemetry events
//! - `DriverError` enum - Error types for driver operations
//! - `DeviceInfo` struct - Identification reported on attach
//! - `DriverFactory` type alias - Factory function type

use crate::config::DriverConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error types for driver operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    /// Operation requires an opened driver
    #[error("Driver not opened")]
    NotOpen,

    /// Device did not attach in time
    #[error("Device did not attach within {0:?}")]
    AttachTimeout(Duration),

    /// Motor index outside the board's motor count
    #[error("Invalid motor index {index} (board has {count} motors)")]
    InvalidMotor {
        /// Requested index
        index: usize,
        /// Motors available on the board
        count: usize,
    },

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    Communication(String),

    /// Error reported by the device itself
    #[error("Device error {code}: {description}")]
    Device {
        /// Vendor error code
        code: i32,
        /// Vendor description
        description: String,
    },

    /// Driver handle already closed
    #[error("Driver closed")]
    Closed,

    /// Driver not found in the registry
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

impl DriverError {
    /// Numeric code reported alongside the description.
    ///
    /// Device errors keep the vendor code; the others use fixed codes
    /// from a private range so they never collide with vendor codes.
    pub fn code(&self) -> i32 {
        match self {
            DriverError::Device { code, .. } => *code,
            DriverError::NotOpen => -100,
            DriverError::AttachTimeout(_) => -101,
            DriverError::InvalidMotor { .. } => -102,
            DriverError::Communication(_) => -103,
            DriverError::Closed => -104,
            DriverError::DriverNotFound(_) => -105,
        }
    }
}

/// Identification reported by a device once attached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// Device is attached
    pub attached: bool,
    /// Human readable device type
    pub name: String,
    /// Board serial number
    pub serial_number: i32,
    /// Firmware version
    pub version: i32,
    /// Number of motors driven by the board
    pub motor_count: usize,
}

/// Sink for events emitted by a driver.
///
/// Events are informational: the controller never depends on them for
/// control flow. Every method has a no-op default so sinks only override
/// what they care about.
pub trait DriverEvents: Send + Sync {
    /// Device attached.
    fn on_attach(&self, _device: &DeviceInfo) {}

    /// Device detached.
    fn on_detach(&self, _device: &DeviceInfo) {}

    /// Device reported an asynchronous error.
    fn on_error(&self, _serial_number: i32, _code: i32, _description: &str) {}

    /// Motor current draw changed.
    fn on_current_change(&self, _serial_number: i32, _motor: usize, _current: f64) {}

    /// Digital input state changed.
    fn on_input_change(&self, _serial_number: i32, _input: usize, _state: bool) {}

    /// Motor position changed.
    fn on_position_change(&self, _serial_number: i32, _motor: usize, _position: i64) {}

    /// Motor velocity changed.
    fn on_velocity_change(&self, _serial_number: i32, _motor: usize, _velocity: f64) {}
}

/// Event sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvents;

impl DriverEvents for NullEvents {}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn(&DriverConfig) -> Box<dyn StepperDriver>;

/// Trait defining the interface for stepper controller boards.
///
/// # Lifecycle
///
/// 1. `open()` - Register the event sink and start device discovery
/// 2. `wait_for_attach()` - Block until the device is attached or timeout
/// 3. configuration and motion calls
/// 4. `close()` - Release the device handle
///
/// All motion calls take the motor index on the board. Positions are in
/// driver units (microsteps).
pub trait StepperDriver: Send {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Open the device handle and register the event sink.
    fn open(&mut self, events: Arc<dyn DriverEvents>) -> Result<(), DriverError>;

    /// Block until the device attaches.
    ///
    /// # Errors
    /// Returns `DriverError::AttachTimeout` if the device is not attached
    /// within `timeout`.
    fn wait_for_attach(&mut self, timeout: Duration) -> Result<DeviceInfo, DriverError>;

    /// Set acceleration in steps/s².
    fn set_acceleration(&mut self, motor: usize, value: f64) -> Result<(), DriverError>;

    /// Set velocity limit in steps/s.
    fn set_velocity_limit(&mut self, motor: usize, value: f64) -> Result<(), DriverError>;

    /// Set current limit in amperes.
    fn set_current_limit(&mut self, motor: usize, value: f64) -> Result<(), DriverError>;

    /// Enable or disable holding torque.
    fn set_engaged(&mut self, motor: usize, engaged: bool) -> Result<(), DriverError>;

    /// Command a new absolute target position. Returns immediately.
    fn set_target_position(&mut self, motor: usize, position: i64) -> Result<(), DriverError>;

    /// Read the position the device currently reports.
    fn current_position(&mut self, motor: usize) -> Result<i64, DriverError>;

    /// Redefine the current position without moving.
    fn set_current_position(&mut self, motor: usize, position: i64) -> Result<(), DriverError>;

    /// Release the device handle.
    fn close(&mut self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Device {
            code: 13,
            description: "stall".to_string(),
        };
        assert!(err.to_string().contains("13"));
        assert!(err.to_string().contains("stall"));

        let err = DriverError::DriverNotFound("phidget".to_string());
        assert!(err.to_string().contains("phidget"));
    }

    #[test]
    fn test_driver_error_codes() {
        let device = DriverError::Device {
            code: 7,
            description: String::new(),
        };
        assert_eq!(device.code(), 7);
        assert_eq!(DriverError::NotOpen.code(), -100);
        assert_ne!(
            DriverError::Closed.code(),
            DriverError::AttachTimeout(Duration::from_secs(1)).code()
        );
    }

    #[test]
    fn test_device_info_default() {
        let info = DeviceInfo::default();
        assert!(!info.attached);
        assert_eq!(info.motor_count, 0);
    }

    #[test]
    fn test_null_events_accept_everything() {
        let sink: Arc<dyn DriverEvents> = Arc::new(NullEvents);
        sink.on_attach(&DeviceInfo::default());
        sink.on_error(1, 2, "x");
        sink.on_position_change(1, 0, 5);
    }
}
