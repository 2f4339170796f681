//! Prelude module for common re-exports.
//!
//! ```rust
//! use stepctl_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, ControllerConfig, DriverConfig, MotorConfig, SharedConfig,
    SimulationConfig, TargetPolicy, WatchdogConfig,
};

// ─── Commands ───────────────────────────────────────────────────────
pub use crate::command::{Command, CommandKind, CommandParseError};

// ─── Drivers ────────────────────────────────────────────────────────
pub use crate::driver::{
    DeviceInfo, DriverError, DriverEvents, DriverFactory, NullEvents, StepperDriver,
};
