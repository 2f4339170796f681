//! Shared test helpers: a recording driver and fast configurations.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use stepctl_common::config::{ControllerConfig, MotorConfig};
use stepctl_common::driver::{DeviceInfo, DriverError, DriverEvents, StepperDriver};

/// One driver call as seen by the recording driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open,
    WaitForAttach,
    Acceleration(f64),
    VelocityLimit(f64),
    CurrentLimit(f64),
    Engaged(bool),
    Target(i64),
    ReadPosition,
    SetPosition(i64),
    Close,
}

#[derive(Default)]
struct ProbeState {
    calls: Vec<Call>,
    positions: Vec<i64>,
    position: i64,
    engaged: bool,
    fail_attach: bool,
    stall: bool,
    fail_target: Option<DriverError>,
}

/// Test-side view of a [`RecordingDriver`] after it moved into the controller.
#[derive(Clone, Default)]
pub struct Probe {
    inner: Arc<Mutex<ProbeState>>,
}

impl Probe {
    /// Every call, position reads included.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    /// Every call except position reads.
    pub fn commands(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| *c != Call::ReadPosition)
            .collect()
    }

    /// Every position the motor has physically occupied, in order.
    pub fn positions(&self) -> Vec<i64> {
        self.inner.lock().positions.clone()
    }

    pub fn position(&self) -> i64 {
        self.inner.lock().position
    }

    pub fn engaged(&self) -> bool {
        self.inner.lock().engaged
    }

    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.calls.clear();
        state.positions.clear();
    }

    pub fn fail_attach(&self) {
        self.inner.lock().fail_attach = true;
    }

    /// Targets are accepted but the motor never moves.
    pub fn stall(&self) {
        self.inner.lock().stall = true;
    }

    /// The next and all following targets fail with `error`.
    pub fn fail_target(&self, error: DriverError) {
        self.inner.lock().fail_target = Some(error);
    }
}

/// Driver that records every call and reaches targets instantly while engaged.
pub struct RecordingDriver {
    probe: Probe,
}

impl RecordingDriver {
    pub fn new() -> (Self, Probe) {
        let probe = Probe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }

    fn record(&self, call: Call) {
        self.probe.inner.lock().calls.push(call);
    }
}

impl StepperDriver for RecordingDriver {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn version(&self) -> &'static str {
        "0.0.0"
    }

    fn open(&mut self, _events: Arc<dyn DriverEvents>) -> Result<(), DriverError> {
        self.record(Call::Open);
        Ok(())
    }

    fn wait_for_attach(&mut self, timeout: Duration) -> Result<DeviceInfo, DriverError> {
        self.record(Call::WaitForAttach);
        if self.probe.inner.lock().fail_attach {
            return Err(DriverError::AttachTimeout(timeout));
        }
        Ok(DeviceInfo {
            attached: true,
            name: "Recording Stepper".to_string(),
            serial_number: 1,
            version: 1,
            motor_count: 1,
        })
    }

    fn set_acceleration(&mut self, _motor: usize, value: f64) -> Result<(), DriverError> {
        self.record(Call::Acceleration(value));
        Ok(())
    }

    fn set_velocity_limit(&mut self, _motor: usize, value: f64) -> Result<(), DriverError> {
        self.record(Call::VelocityLimit(value));
        Ok(())
    }

    fn set_current_limit(&mut self, _motor: usize, value: f64) -> Result<(), DriverError> {
        self.record(Call::CurrentLimit(value));
        Ok(())
    }

    fn set_engaged(&mut self, _motor: usize, engaged: bool) -> Result<(), DriverError> {
        self.record(Call::Engaged(engaged));
        self.probe.inner.lock().engaged = engaged;
        Ok(())
    }

    fn set_target_position(&mut self, _motor: usize, position: i64) -> Result<(), DriverError> {
        self.record(Call::Target(position));
        let mut state = self.probe.inner.lock();
        if let Some(error) = state.fail_target.clone() {
            return Err(error);
        }
        if state.engaged && !state.stall && state.position != position {
            state.position = position;
            state.positions.push(position);
        }
        Ok(())
    }

    fn current_position(&mut self, _motor: usize) -> Result<i64, DriverError> {
        self.record(Call::ReadPosition);
        Ok(self.probe.inner.lock().position)
    }

    fn set_current_position(&mut self, _motor: usize, position: i64) -> Result<(), DriverError> {
        self.record(Call::SetPosition(position));
        let mut state = self.probe.inner.lock();
        state.position = position;
        state.positions.push(position);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.record(Call::Close);
        Ok(())
    }
}

/// Motor settings with no settle or teardown pauses.
pub fn fast_motor() -> MotorConfig {
    MotorConfig {
        settle_delay_ms: 0,
        teardown_delay_ms: 0,
        ..MotorConfig::default()
    }
}

/// Full configuration for tests: instant homing, fast simulated kinematics.
pub fn fast_config() -> ControllerConfig {
    let mut config = ControllerConfig::default();
    config.motor = MotorConfig {
        acceleration: 1.0e9,
        velocity_limit: 1.0e7,
        ..fast_motor()
    };
    config.driver.attach_timeout_ms = 1000;
    config.driver.simulation.attach_delay_ms = 0;
    config
}
