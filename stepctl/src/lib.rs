//! # stepctl Library
//!
//! Single-axis stepper controller driven by integer commands, one per line.
//!
//! Drivers implement the `StepperDriver` trait defined in
//! `stepctl_common::driver`.
//!
//! # Module Structure
//!
//! - [`controller`] - `MotorController`, motor state and motion sequences
//! - [`watchdog`] - Idle watchdog background thread
//! - [`dispatcher`] - Init / run / teardown lifecycle and command loop
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//! - [`events`] - Tracing event sink for driver events
//! - [`error`] - `ControlError`
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          stepctl                               │
//! │  stdin ──► ┌───────────────────┐     ┌──────────────────────┐  │
//! │            │ CommandDispatcher │────►│  MotorController     │  │
//! │            └───────────────────┘     │  Mutex<MotorState>   │  │
//! │            ┌───────────────────┐     │                      │  │
//! │            │ IdleWatchdog      │────►│                      │  │
//! │            │ (thread)          │     └──────────┬───────────┘  │
//! │            └───────────────────┘                │              │
//! │                                                 ▼              │
//! │                                     ┌──────────────────────┐   │
//! │              TracingEvents ◄─────── │ StepperDriver        │   │
//! │                                     │ (trait object)       │   │
//! │                                     └──────────────────────┘   │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod controller;
pub mod dispatcher;
pub mod driver_registry;
pub mod drivers;
pub mod error;
pub mod events;
pub mod watchdog;

// Re-export key types for convenience
pub use crate::controller::{MotorController, MotorSnapshot};
pub use crate::dispatcher::{CommandDispatcher, DispatchSummary};
pub use crate::driver_registry::DriverRegistry;
pub use crate::error::ControlError;
pub use crate::events::TracingEvents;
pub use crate::watchdog::{IdleWatchdog, WatchdogHandle, WatchdogOutcome};
