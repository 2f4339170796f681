//! Motor controller and motion sequences.
//!
//! The `MotorController` owns the driver handle and the logical state of the
//! axis. All driver calls go through one mutex, so the idle watchdog and the
//! command loop never interleave at the driver level: a move holds the lock
//! until the driver reports the target reached.

use crate::error::ControlError;
use parking_lot::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use stepctl_common::config::{MotorConfig, TargetPolicy};
use stepctl_common::driver::StepperDriver;
use tracing::{debug, error, info, warn};

/// Logical state of the axis, guarded by the controller mutex.
pub(crate) struct MotorState {
    /// Active driver instance
    driver: Box<dyn StepperDriver>,
    /// Holding torque applied
    engaged: bool,
    /// Last target issued, `None` before the first move
    target_position: Option<i64>,
    /// Moment the last move was initiated
    last_motion: Instant,
    /// Driver handle released
    closed: bool,
}

impl MotorState {
    fn ensure_open(&self) -> Result<(), ControlError> {
        if self.closed {
            return Err(ControlError::ShutDown);
        }
        Ok(())
    }

    fn set_engaged(&mut self, motor: usize, engaged: bool) -> Result<(), ControlError> {
        self.ensure_open()?;
        self.driver.set_engaged(motor, engaged)?;
        self.engaged = engaged;
        Ok(())
    }

    /// Disengage on behalf of the idle watchdog.
    pub(crate) fn idle_disengage(&mut self, motor: usize) -> Result<(), ControlError> {
        self.set_engaged(motor, false)
    }

    pub(crate) fn last_motion(&self) -> Instant {
        self.last_motion
    }

    pub(crate) fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Point-in-time copy of the motor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorSnapshot {
    /// Holding torque applied
    pub engaged: bool,
    /// Last target issued
    pub target_position: Option<i64>,
    /// Moment the last move was initiated
    pub last_motion: Instant,
    /// Driver handle released
    pub closed: bool,
}

/// Controller for a single stepper axis.
pub struct MotorController {
    state: Mutex<MotorState>,
    config: MotorConfig,
}

impl MotorController {
    /// Wrap an opened and attached driver.
    ///
    /// The driver is assumed disengaged; no driver call is made here.
    pub fn new(driver: Box<dyn StepperDriver>, config: MotorConfig) -> Self {
        Self {
            state: Mutex::new(MotorState {
                driver,
                engaged: false,
                target_position: None,
                last_motion: Instant::now(),
                closed: false,
            }),
            config,
        }
    }

    /// Motor index on the board.
    pub fn motor(&self) -> usize {
        self.config.index
    }

    /// Apply acceleration, velocity limit and current limit.
    pub fn configure(&self) -> Result<(), ControlError> {
        let motor = self.motor();
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.driver.set_acceleration(motor, self.config.acceleration)?;
        state.driver.set_velocity_limit(motor, self.config.velocity_limit)?;
        state.driver.set_current_limit(motor, self.config.current_limit)?;
        info!(
            "Motor {} configured: acceleration={}, velocity_limit={}, current_limit={}A",
            motor, self.config.acceleration, self.config.velocity_limit, self.config.current_limit
        );
        Ok(())
    }

    /// Homing sequence.
    ///
    /// Assumes the axis sits at its maximum end-stop: the driver's position
    /// is redefined as `max_position` and the axis is driven back to 0.
    pub fn reset(&self) -> Result<(), ControlError> {
        let motor = self.motor();
        let settle = self.config.settle_delay();
        let mut state = self.state.lock();

        info!("Reset: disengaging motor");
        state.set_engaged(motor, false)?;

        info!("Reset: current position set to max ({})", self.config.max_position);
        state.driver.set_current_position(motor, self.config.max_position)?;
        thread::sleep(settle);

        info!("Reset: engaging motor");
        state.set_engaged(motor, true)?;
        thread::sleep(settle);

        info!("Reset: returning to origin");
        self.issue_move(&mut state, 0)
    }

    /// Apply holding torque.
    pub fn engage(&self) -> Result<(), ControlError> {
        let motor = self.motor();
        let mut state = self.state.lock();
        state.set_engaged(motor, true)?;
        debug!("Motor {} engaged", motor);
        Ok(())
    }

    /// Release holding torque.
    pub fn disengage(&self) -> Result<(), ControlError> {
        let motor = self.motor();
        let mut state = self.state.lock();
        state.set_engaged(motor, false)?;
        debug!("Motor {} disengaged", motor);
        Ok(())
    }

    /// Move to an absolute position and block until the driver reports it.
    pub fn move_to(&self, position: i64) -> Result<(), ControlError> {
        let mut state = self.state.lock();
        self.move_to_locked(&mut state, position)
    }

    /// Step forward by `noise_steps` and come back.
    ///
    /// Both moves bypass the target policy, so the jitter also happens at
    /// the end-stop.
    pub fn make_noise(&self) -> Result<(), ControlError> {
        let motor = self.motor();
        let mut state = self.state.lock();
        state.ensure_open()?;
        let origin = state.driver.current_position(motor)?;
        let out = noise_target(origin, self.config.noise_steps);
        debug!("Noise around position {} (out to {})", origin, out);
        self.issue_move(&mut state, out)?;
        self.issue_move(&mut state, origin)
    }

    /// Position currently reported by the driver.
    pub fn current_position(&self) -> Result<i64, ControlError> {
        let motor = self.motor();
        let mut state = self.state.lock();
        state.ensure_open()?;
        Ok(state.driver.current_position(motor)?)
    }

    /// Refresh the idle timer without moving.
    pub fn touch(&self) {
        self.state.lock().last_motion = Instant::now();
    }

    /// Copy of the logical state.
    pub fn snapshot(&self) -> MotorSnapshot {
        let state = self.state.lock();
        MotorSnapshot {
            engaged: state.engaged,
            target_position: state.target_position,
            last_motion: state.last_motion,
            closed: state.closed,
        }
    }

    /// Lock the state unless a command currently holds it.
    pub(crate) fn try_state(&self) -> Option<MutexGuard<'_, MotorState>> {
        self.state.try_lock()
    }

    /// Disengage and release the driver.
    ///
    /// Both steps are attempted even if the first fails; the first error is
    /// returned. Calling this on a closed controller is a no-op.
    pub fn shutdown(&self) -> Result<(), ControlError> {
        let mut state = self.state.lock();
        self.shutdown_locked(&mut state)
    }

    /// Like [`shutdown`](Self::shutdown) but gives up if the state cannot be
    /// locked within `wait` (a move is still in flight).
    ///
    /// Returns `Ok(false)` when the lock was not acquired.
    pub fn try_shutdown_for(&self, wait: Duration) -> Result<bool, ControlError> {
        match self.state.try_lock_for(wait) {
            Some(mut state) => self.shutdown_locked(&mut state).map(|_| true),
            None => Ok(false),
        }
    }

    fn shutdown_locked(&self, state: &mut MotorState) -> Result<(), ControlError> {
        if state.closed {
            return Ok(());
        }
        let motor = self.motor();
        info!("Releasing motor {}", motor);

        let disengaged = state.set_engaged(motor, false);
        if let Err(ref e) = disengaged {
            error!("Disengage during teardown failed ({}): {}", e.code(), e);
        }
        thread::sleep(self.config.teardown_delay());

        let closed = state.driver.close().map_err(ControlError::from);
        if let Err(ref e) = closed {
            error!("Closing driver failed ({}): {}", e.code(), e);
        }
        state.closed = true;

        disengaged.and(closed)
    }

    /// Apply the target policy. `None` means the move is skipped.
    fn resolve_target(&self, position: i64) -> Option<i64> {
        let max = self.config.max_position;
        if (0..=max).contains(&position) {
            return Some(position);
        }
        match self.config.target_policy {
            TargetPolicy::PassThrough => Some(position),
            TargetPolicy::Clamp => {
                let clamped = position.clamp(0, max);
                warn!("Target {} outside [0, {}], clamped to {}", position, max, clamped);
                Some(clamped)
            }
            TargetPolicy::Reject => {
                warn!("Target {} outside [0, {}], move rejected", position, max);
                None
            }
        }
    }

    fn move_to_locked(&self, state: &mut MotorState, position: i64) -> Result<(), ControlError> {
        state.ensure_open()?;
        match self.resolve_target(position) {
            Some(target) => self.issue_move(state, target),
            None => Ok(()),
        }
    }

    /// Engage if needed, send `target` and wait for it. No policy applied.
    fn issue_move(&self, state: &mut MotorState, target: i64) -> Result<(), ControlError> {
        let motor = self.motor();
        state.ensure_open()?;

        state.last_motion = Instant::now();
        if !state.engaged {
            state.set_engaged(motor, true)?;
        }

        info!("Moving to position {}", target);
        state.driver.set_target_position(motor, target)?;
        state.target_position = Some(target);

        self.wait_for_position(state, target)
    }

    fn wait_for_position(&self, state: &mut MotorState, target: i64) -> Result<(), ControlError> {
        let motor = self.motor();
        let poll = self.config.poll_interval();
        let timeout = self.config.move_timeout();
        let started = Instant::now();
        let mut polls: u64 = 0;

        loop {
            let position = state.driver.current_position(motor)?;
            if position == target {
                debug!("Reached {} after {} polls", target, polls);
                return Ok(());
            }

            if let Some(limit) = timeout {
                let waited = started.elapsed();
                if waited >= limit {
                    return Err(ControlError::MoveTimeout {
                        target,
                        position,
                        waited,
                    });
                }
            }

            polls += 1;
            thread::sleep(poll);
        }
    }
}

/// Far end of the noise jitter. Steps the other way when going forward
/// would leave the `i64` range.
fn noise_target(origin: i64, steps: i64) -> i64 {
    origin
        .checked_add(steps)
        .unwrap_or_else(|| origin.wrapping_sub(steps))
}
