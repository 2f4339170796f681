//! System-wide constants for the stepctl workspace.
//!
//! Single source of truth for the control signal values of the input
//! protocol and for the configuration defaults.

/// Canonical service name (used for logging).
pub const SERVICE_NAME: &str = "stepctl";

// ─── Control signals ────────────────────────────────────────────────

/// Input value requesting the homing/reset sequence.
pub const CONTROL_RESET: i64 = -1;

/// Input value requesting a disengage.
pub const CONTROL_DISENGAGE: i64 = -2;

/// Input value requesting an engage.
pub const CONTROL_ENGAGE: i64 = -3;

/// Input value requesting the presence jitter.
pub const CONTROL_MAKE_NOISE: i64 = -4;

// ─── Motor defaults ─────────────────────────────────────────────────

/// Motor index on the controller board. Only one axis is driven.
pub const DEFAULT_MOTOR_INDEX: usize = 0;

/// Acceleration in driver units (steps/s²).
pub const DEFAULT_ACCELERATION: f64 = 350_543.0;

/// Velocity limit in driver units (steps/s).
pub const DEFAULT_VELOCITY_LIMIT: f64 = 230_200.0;

/// Current limit in amperes.
pub const DEFAULT_CURRENT_LIMIT: f64 = 2.0;

/// Position assigned to the end-stop during homing.
pub const DEFAULT_MAX_POSITION: i64 = 5500;

/// Steps travelled forward (and back) by the presence jitter.
pub const DEFAULT_NOISE_STEPS: i64 = 50;

/// Pause between homing steps, in milliseconds.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;

/// Pause between disengage and close at teardown, in milliseconds.
pub const DEFAULT_TEARDOWN_DELAY_MS: u64 = 1000;

/// Interval between position polls while a move is in flight, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1;

// ─── Watchdog defaults ──────────────────────────────────────────────

/// Inactivity after which the motor is disengaged, in seconds.
pub const DEFAULT_IDLE_TIMEOUT_S: u64 = 120;

/// Interval between idle checks, in seconds.
pub const DEFAULT_WATCHDOG_PERIOD_S: u64 = 60;

// ─── Driver defaults ────────────────────────────────────────────────

/// Driver selected when neither the CLI nor the config names one.
pub const DEFAULT_DRIVER: &str = "simulation";

/// Maximum wait for the device to attach, in milliseconds.
pub const DEFAULT_ATTACH_TIMEOUT_MS: u64 = 10_000;
