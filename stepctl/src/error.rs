//! Controller error type.
//!
//! Every variant is fatal to the dispatcher: the process tears down and
//! exits non-zero.

use std::time::Duration;
use stepctl_common::command::CommandParseError;
use stepctl_common::config::ConfigError;
use stepctl_common::driver::DriverError;
use thiserror::Error;

/// Errors raised by the controller, watchdog and dispatcher.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Driver call failed
    #[error("Driver error {}: {}", .0.code(), .0)]
    Driver(#[from] DriverError),

    /// Input line was not an integer
    #[error(transparent)]
    Parse(#[from] CommandParseError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Reading input failed
    #[error("Input error: {0}")]
    Io(#[from] std::io::Error),

    /// Move did not converge within the configured timeout
    #[error("Move to {target} timed out after {waited:?} (last position {position})")]
    MoveTimeout {
        /// Requested target
        target: i64,
        /// Last position reported by the driver
        position: i64,
        /// Time spent waiting
        waited: Duration,
    },

    /// Controller already torn down
    #[error("Controller already shut down")]
    ShutDown,
}

impl ControlError {
    /// Numeric code printed with the error description.
    pub fn code(&self) -> i32 {
        match self {
            ControlError::Driver(e) => e.code(),
            ControlError::Parse(_) => -200,
            ControlError::Config(_) => -201,
            ControlError::Io(_) => -202,
            ControlError::MoveTimeout { .. } => -203,
            ControlError::ShutDown => -204,
        }
    }
}
