//! Command dispatcher and process lifecycle.
//!
//! # Lifecycle
//!
//! 1. `init()` - create and open the driver, wait for attach, configure
//!    limits, home the axis, start the idle watchdog
//! 2. `run()` - read one line at a time, parse, dispatch; ends at end of input
//! 3. `teardown()` - stop the watchdog, disengage, close the driver
//!
//! Dispatch is synchronous: the next line is not read until the current
//! command has completed.

use crate::controller::MotorController;
use crate::driver_registry::DriverRegistry;
use crate::error::ControlError;
use crate::events::log_device_info;
use crate::watchdog::{IdleWatchdog, WatchdogHandle};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use stepctl_common::command::{Command, CommandKind};
use stepctl_common::config::ControllerConfig;
use stepctl_common::driver::{DriverEvents, StepperDriver};
use tracing::{debug, error, info};

/// Commands handled by one `run()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    counts: BTreeMap<CommandKind, u64>,
}

impl DispatchSummary {
    fn record(&mut self, command: Command) {
        *self.counts.entry(command.kind()).or_insert(0) += 1;
    }

    /// Commands of `kind` executed.
    pub fn count(&self, kind: CommandKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Commands executed.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Reads commands and drives the controller.
pub struct CommandDispatcher {
    controller: Arc<MotorController>,
    watchdog: Option<WatchdogHandle>,
}

impl CommandDispatcher {
    /// Create the configured driver from `registry` and bring the axis up.
    pub fn init(
        registry: &DriverRegistry,
        config: &ControllerConfig,
        events: Arc<dyn DriverEvents>,
    ) -> Result<Self, ControlError> {
        let driver = registry.create_driver(&config.driver)?;
        Self::init_with_driver(driver, config, events)
    }

    /// Bring the axis up on an already created driver.
    ///
    /// On any failure the driver is released before the error is returned.
    pub fn init_with_driver(
        mut driver: Box<dyn StepperDriver>,
        config: &ControllerConfig,
        events: Arc<dyn DriverEvents>,
    ) -> Result<Self, ControlError> {
        info!("Created driver: {} v{}", driver.name(), driver.version());

        info!("Opening device...");
        if let Err(e) = driver.open(events) {
            release_driver(driver.as_mut());
            return Err(e.into());
        }

        info!("Waiting for attach ({:?})...", config.driver.attach_timeout());
        let device = match driver.wait_for_attach(config.driver.attach_timeout()) {
            Ok(device) => device,
            Err(e) => {
                error!("Attach failed ({}): {}", e.code(), e);
                release_driver(driver.as_mut());
                return Err(e.into());
            }
        };
        log_device_info(&device);

        let controller = Arc::new(MotorController::new(driver, config.motor.clone()));
        let prepared = controller
            .configure()
            .and_then(|_| controller.reset())
            .and_then(|_| {
                controller.touch();
                IdleWatchdog::new(Arc::clone(&controller), &config.watchdog)
                    .start()
                    .map_err(ControlError::from)
            });

        match prepared {
            Ok(watchdog) => {
                info!("Controller ready");
                Ok(Self {
                    controller,
                    watchdog: Some(watchdog),
                })
            }
            Err(e) => {
                // Already logged by the controller if teardown fails
                let _ = controller.shutdown();
                Err(e)
            }
        }
    }

    /// Shared controller, e.g. for a signal handler.
    pub fn controller(&self) -> Arc<MotorController> {
        Arc::clone(&self.controller)
    }

    /// Running watchdog, until teardown.
    pub fn watchdog(&self) -> Option<&WatchdogHandle> {
        self.watchdog.as_ref()
    }

    /// Process every line of `input` until end of stream.
    ///
    /// Stops at the first malformed line or failed command.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<DispatchSummary, ControlError> {
        let mut summary = DispatchSummary::default();
        let mut stdout = io::stdout();

        for line in input.lines() {
            let line = line?;
            info!("Received: {}", line.trim_end());

            let command: Command = line.parse()?;
            self.dispatch(command)?;
            summary.record(command);

            stdout.flush()?;
        }

        info!("End of input after {} commands", summary.total());
        Ok(summary)
    }

    /// Execute one command.
    pub fn dispatch(&self, command: Command) -> Result<(), ControlError> {
        debug!(motion = command.is_motion(), "Dispatching {}", command);
        match command {
            Command::Reset => self.controller.reset(),
            Command::Disengage => self.controller.disengage(),
            Command::Engage => self.controller.engage(),
            Command::MakeNoise => self.controller.make_noise(),
            Command::MoveTo(position) => self.controller.move_to(position),
        }
    }

    /// Stop the watchdog and release the motor.
    ///
    /// Errors are logged and returned; the release is attempted regardless.
    pub fn teardown(mut self) -> Result<(), ControlError> {
        self.teardown_inner()
    }

    fn teardown_inner(&mut self) -> Result<(), ControlError> {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.stop();
        }
        self.controller.shutdown()
    }
}

impl Drop for CommandDispatcher {
    fn drop(&mut self) {
        let _ = self.teardown_inner();
    }
}

fn release_driver(driver: &mut dyn StepperDriver) {
    if let Err(e) = driver.close() {
        error!("Closing driver failed ({}): {}", e.code(), e);
    }
}
