//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `StepperDriver` trait to provide a
//! software-emulated stepper board for development and testing without
//! physical hardware. Motion follows [`AxisSimulator`] kinematics; events are
//! delivered synchronously to the registered sink.

use super::physics::AxisSimulator;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use stepctl_common::config::SimulationConfig;
use stepctl_common::driver::{DeviceInfo, DriverError, DriverEvents, StepperDriver};
use tracing::{debug, info, warn};

/// Simulation driver implementing the StepperDriver trait.
pub struct SimulationDriver {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    /// Board parameters
    config: SimulationConfig,
    /// Registered event sink
    events: Option<Arc<dyn DriverEvents>>,
    /// Attached flag
    attached: bool,
    /// Closed flag
    closed: bool,
    /// Axis simulators (one per motor)
    axes: Vec<AxisSimulator>,
    /// Last position reported per motor
    reported_positions: Vec<i64>,
    /// Motion flag per motor, for velocity events
    moving: Vec<bool>,
    /// Current limit per motor
    current_limits: Vec<f64>,
}

impl SimulationDriver {
    /// Create a new simulation driver instance.
    pub fn new(config: SimulationConfig) -> Self {
        let now = Instant::now();
        let count = config.motor_count;
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            axes: (0..count)
                .map(|_| AxisSimulator::new(config.initial_position, now))
                .collect(),
            reported_positions: vec![config.initial_position; count],
            moving: vec![false; count],
            current_limits: vec![0.0; count],
            config,
            events: None,
            attached: false,
            closed: false,
        }
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            attached: self.attached,
            name: self.config.device_name.clone(),
            serial_number: self.config.serial_number,
            version: self.config.version,
            motor_count: self.config.motor_count,
        }
    }

    /// Validate lifecycle and index, returning the axis.
    fn axis(&mut self, motor: usize) -> Result<&mut AxisSimulator, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        if self.events.is_none() {
            return Err(DriverError::NotOpen);
        }
        if !self.attached {
            return Err(DriverError::Communication(
                "device not attached".to_string(),
            ));
        }
        let count = self.axes.len();
        self.axes
            .get_mut(motor)
            .ok_or(DriverError::InvalidMotor { index: motor, count })
    }

    /// Emit position and velocity events for changes since the last call.
    fn publish_motion(&mut self, motor: usize, now: Instant) {
        let Some(events) = self.events.clone() else {
            return;
        };
        let serial = self.config.serial_number;
        let axis = &mut self.axes[motor];
        let position = axis.position(now);
        let moving = axis.is_moving();
        let velocity = axis.velocity();

        if position != self.reported_positions[motor] {
            self.reported_positions[motor] = position;
            events.on_position_change(serial, motor, position);
        }
        if moving != self.moving[motor] {
            self.moving[motor] = moving;
            events.on_velocity_change(serial, motor, velocity);
        }
    }
}

impl StepperDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn open(&mut self, events: Arc<dyn DriverEvents>) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        info!(
            "Opening simulated board '{}' (serial {}, {} motors)",
            self.config.device_name, self.config.serial_number, self.config.motor_count
        );
        self.events = Some(events);
        Ok(())
    }

    fn wait_for_attach(&mut self, timeout: Duration) -> Result<DeviceInfo, DriverError> {
        let Some(events) = self.events.clone() else {
            return Err(DriverError::NotOpen);
        };
        if self.attached {
            return Ok(self.device_info());
        }

        let delay = Duration::from_millis(self.config.attach_delay_ms);
        if self.config.fail_attach || delay > timeout {
            thread::sleep(timeout);
            warn!("Simulated board did not attach within {:?}", timeout);
            return Err(DriverError::AttachTimeout(timeout));
        }
        thread::sleep(delay);

        let now = Instant::now();
        for axis in &mut self.axes {
            axis.advance(now);
        }
        self.attached = true;

        let info = self.device_info();
        events.on_attach(&info);
        Ok(info)
    }

    fn set_acceleration(&mut self, motor: usize, value: f64) -> Result<(), DriverError> {
        self.axis(motor)?.set_acceleration(value, Instant::now());
        Ok(())
    }

    fn set_velocity_limit(&mut self, motor: usize, value: f64) -> Result<(), DriverError> {
        self.axis(motor)?.set_velocity_limit(value, Instant::now());
        Ok(())
    }

    fn set_current_limit(&mut self, motor: usize, value: f64) -> Result<(), DriverError> {
        self.axis(motor)?;
        if !(value > 0.0) {
            return Err(DriverError::Device {
                code: 4,
                description: format!("current limit {value} out of range"),
            });
        }
        self.current_limits[motor] = value;
        Ok(())
    }

    fn set_engaged(&mut self, motor: usize, engaged: bool) -> Result<(), DriverError> {
        let now = Instant::now();
        let axis = self.axis(motor)?;
        let changed = axis.is_engaged() != engaged;
        axis.set_engaged(engaged, now);
        debug!("Simulated motor {} engaged={}", motor, engaged);

        if changed {
            let current = if engaged { self.current_limits[motor] } else { 0.0 };
            if let Some(events) = &self.events {
                events.on_current_change(self.config.serial_number, motor, current);
            }
        }
        self.publish_motion(motor, now);
        Ok(())
    }

    fn set_target_position(&mut self, motor: usize, position: i64) -> Result<(), DriverError> {
        let now = Instant::now();
        self.axis(motor)?.set_target(position, now);
        self.publish_motion(motor, now);
        Ok(())
    }

    fn current_position(&mut self, motor: usize) -> Result<i64, DriverError> {
        let now = Instant::now();
        let position = self.axis(motor)?.position(now);
        self.publish_motion(motor, now);
        Ok(position)
    }

    fn set_current_position(&mut self, motor: usize, position: i64) -> Result<(), DriverError> {
        let now = Instant::now();
        self.axis(motor)?.set_position(position, now);
        self.publish_motion(motor, now);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        info!("Closing simulated board {}", self.config.serial_number);
        if self.attached {
            self.attached = false;
            if let Some(events) = &self.events {
                events.on_detach(&self.device_info());
            }
        }
        self.closed = true;
        Ok(())
    }
}
