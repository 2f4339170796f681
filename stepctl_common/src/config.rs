//! Configuration loading traits and types.
//!
//! This module provides the TOML configuration of the controller process.
//! Every section and field has a default taken from [`crate::consts`], so
//! an empty file (or no file at all) yields a working configuration.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! log_level = "debug"
//! service_name = "stepctl-bench"
//!
//! [motor]
//! max_position = 5500
//! noise_steps = 50
//! move_timeout_ms = 30000
//! target_policy = "clamp"
//!
//! [watchdog]
//! idle_timeout_s = 120
//! period_s = 60
//!
//! [driver]
//! name = "simulation"
//! attach_timeout_ms = 10000
//!
//! [driver.simulation]
//! serial_number = 12345
//! ```

use crate::consts::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information, including driver telemetry.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Common configuration fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedConfig {
    /// Logging verbosity level.
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: SERVICE_NAME.to_string(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Handling of `MoveTo` targets outside `[0, max_position]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetPolicy {
    /// Send the target to the driver unchanged.
    #[default]
    PassThrough,
    /// Clamp the target into `[0, max_position]`.
    Clamp,
    /// Skip the move and log a warning.
    Reject,
}

/// Motor parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    /// Motor index on the controller board.
    pub index: usize,
    /// Acceleration in steps/s².
    pub acceleration: f64,
    /// Velocity limit in steps/s.
    pub velocity_limit: f64,
    /// Current limit in amperes.
    pub current_limit: f64,
    /// Position assigned to the end-stop by the homing sequence.
    pub max_position: i64,
    /// Steps travelled by the presence jitter.
    pub noise_steps: i64,
    /// Pause between homing steps.
    pub settle_delay_ms: u64,
    /// Pause between disengage and close at teardown.
    pub teardown_delay_ms: u64,
    /// Interval between position polls while waiting for a move.
    pub poll_interval_ms: u64,
    /// Upper bound on a single move. `None` waits forever.
    pub move_timeout_ms: Option<u64>,
    /// Handling of out-of-range targets.
    pub target_policy: TargetPolicy,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            index: DEFAULT_MOTOR_INDEX,
            acceleration: DEFAULT_ACCELERATION,
            velocity_limit: DEFAULT_VELOCITY_LIMIT,
            current_limit: DEFAULT_CURRENT_LIMIT,
            max_position: DEFAULT_MAX_POSITION,
            noise_steps: DEFAULT_NOISE_STEPS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            teardown_delay_ms: DEFAULT_TEARDOWN_DELAY_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            move_timeout_ms: None,
            target_policy: TargetPolicy::PassThrough,
        }
    }
}

impl MotorConfig {
    /// Pause between homing steps.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Pause between disengage and close at teardown.
    pub fn teardown_delay(&self) -> Duration {
        Duration::from_millis(self.teardown_delay_ms)
    }

    /// Interval between position polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound on a single move, if any.
    pub fn move_timeout(&self) -> Option<Duration> {
        self.move_timeout_ms.map(Duration::from_millis)
    }

    /// Validate the motor parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.acceleration >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "motor.acceleration must be >= 0, got {}",
                self.acceleration
            )));
        }
        if !(self.velocity_limit >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "motor.velocity_limit must be >= 0, got {}",
                self.velocity_limit
            )));
        }
        if !(self.current_limit > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "motor.current_limit must be > 0, got {}",
                self.current_limit
            )));
        }
        if self.max_position <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "motor.max_position must be > 0, got {}",
                self.max_position
            )));
        }
        if self.noise_steps == 0 {
            return Err(ConfigError::ValidationError(
                "motor.noise_steps cannot be 0".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "motor.poll_interval_ms cannot be 0".to_string(),
            ));
        }
        if self.move_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "motor.move_timeout_ms cannot be 0 (omit it to wait forever)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Idle watchdog parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Inactivity after which the motor is disengaged.
    pub idle_timeout_s: u64,
    /// Interval between idle checks.
    pub period_s: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            idle_timeout_s: DEFAULT_IDLE_TIMEOUT_S,
            period_s: DEFAULT_WATCHDOG_PERIOD_S,
        }
    }
}

impl WatchdogConfig {
    /// Inactivity after which the motor is disengaged.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_s)
    }

    /// Interval between idle checks.
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_s)
    }

    /// Validate the watchdog parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_s == 0 {
            return Err(ConfigError::ValidationError(
                "watchdog.period_s cannot be 0".to_string(),
            ));
        }
        if self.idle_timeout_s == 0 {
            return Err(ConfigError::ValidationError(
                "watchdog.idle_timeout_s cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of the built-in simulation driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Reported board serial number.
    pub serial_number: i32,
    /// Reported device type.
    pub device_name: String,
    /// Reported firmware version.
    pub version: i32,
    /// Motors on the simulated board.
    pub motor_count: usize,
    /// Delay between `open()` and attach.
    pub attach_delay_ms: u64,
    /// Never attach, to exercise the attach timeout path.
    pub fail_attach: bool,
    /// Position reported before the first homing.
    pub initial_position: i64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            serial_number: 0,
            device_name: "Simulated Bipolar Stepper Controller".to_string(),
            version: 100,
            motor_count: 1,
            attach_delay_ms: 50,
            fail_attach: false,
            initial_position: 0,
        }
    }
}

/// Driver selection and attach parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Registered driver name.
    pub name: String,
    /// Maximum wait for the device to attach.
    pub attach_timeout_ms: u64,
    /// Simulation driver parameters.
    pub simulation: SimulationConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DRIVER.to_string(),
            attach_timeout_ms: DEFAULT_ATTACH_TIMEOUT_MS,
            simulation: SimulationConfig::default(),
        }
    }
}

impl DriverConfig {
    /// Maximum wait for the device to attach.
    pub fn attach_timeout(&self) -> Duration {
        Duration::from_millis(self.attach_timeout_ms)
    }

    /// Validate the driver parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "driver.name cannot be empty".to_string(),
            ));
        }
        if self.simulation.motor_count == 0 {
            return Err(ConfigError::ValidationError(
                "driver.simulation.motor_count cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full configuration of the controller process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Logging and identity.
    pub shared: SharedConfig,
    /// Motor parameters.
    pub motor: MotorConfig,
    /// Idle watchdog parameters.
    pub watchdog: WatchdogConfig,
    /// Driver selection.
    pub driver: DriverConfig,
}

impl ControllerConfig {
    /// Load and validate a configuration file.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.motor.validate()?;
        self.watchdog.validate()?;
        self.driver.validate()?;
        if self.driver.name == DEFAULT_DRIVER
            && self.motor.index >= self.driver.simulation.motor_count
        {
            return Err(ConfigError::ValidationError(format!(
                "motor.index {} out of range for simulated board with {} motors",
                self.motor.index, self.driver.simulation.motor_count
            )));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
