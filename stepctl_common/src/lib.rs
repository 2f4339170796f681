//! stepctl Common Library
//!
//! This crate provides the types shared by every stepctl crate: the input
//! command protocol, the stepper driver contract and the configuration
//! loading utilities.
//!
//! # Module Structure
//!
//! - [`consts`] - Control signal values and configuration defaults
//! - [`command`] - `Command` type and line parser
//! - [`driver`] - `StepperDriver` trait, `DriverEvents` sink, `DriverError`
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use stepctl_common::prelude::*;
//!
//! let cmd: Command = "-3".parse().unwrap();
//! assert_eq!(cmd, Command::Engage);
//! ```

pub mod command;
pub mod config;
pub mod consts;
pub mod driver;
pub mod prelude;
