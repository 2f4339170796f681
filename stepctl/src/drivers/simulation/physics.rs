//! Stepper axis physics simulator.
//!
//! Integrates a trapezoidal velocity profile bounded by the configured
//! acceleration and velocity limit. The simulator has no cycle of its own:
//! every query advances the state to "now" in fixed sub-steps.

use std::time::{Duration, Instant};
use tracing::trace;

/// Integration sub-step.
const STEP: Duration = Duration::from_millis(1);

/// Simulated single stepper motor.
#[derive(Debug, Clone)]
pub struct AxisSimulator {
    /// Current position in steps
    position: f64,
    /// Current velocity in steps/second
    velocity: f64,
    /// Target position from command
    target: i64,
    /// Acceleration in steps/s²
    acceleration: f64,
    /// Velocity limit in steps/s
    velocity_limit: f64,
    /// Is holding torque applied?
    engaged: bool,
    /// Time the state was last integrated to
    last_update: Instant,
}

impl AxisSimulator {
    /// Create a disengaged axis resting at `position`.
    pub fn new(position: i64, now: Instant) -> Self {
        Self {
            position: position as f64,
            velocity: 0.0,
            target: position,
            acceleration: 0.0,
            velocity_limit: 0.0,
            engaged: false,
            last_update: now,
        }
    }

    /// Set acceleration limit.
    pub fn set_acceleration(&mut self, value: f64, now: Instant) {
        self.advance(now);
        self.acceleration = value;
    }

    /// Set velocity limit.
    pub fn set_velocity_limit(&mut self, value: f64, now: Instant) {
        self.advance(now);
        self.velocity_limit = value;
    }

    /// Apply or release holding torque. A released motor stops where it is.
    pub fn set_engaged(&mut self, engaged: bool, now: Instant) {
        self.advance(now);
        if !engaged {
            self.velocity = 0.0;
        }
        self.engaged = engaged;
    }

    /// Command a new target.
    pub fn set_target(&mut self, target: i64, now: Instant) {
        self.advance(now);
        self.target = target;
    }

    /// Redefine the current position. Any motion in progress is dropped.
    pub fn set_position(&mut self, position: i64, now: Instant) {
        self.advance(now);
        self.position = position as f64;
        self.target = position;
        self.velocity = 0.0;
    }

    /// Reported position, rounded to whole steps.
    pub fn position(&mut self, now: Instant) -> i64 {
        self.advance(now);
        self.position.round() as i64
    }

    /// Current velocity.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Is holding torque applied?
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Is the axis travelling toward its target?
    pub fn is_moving(&self) -> bool {
        self.engaged && (self.velocity != 0.0 || self.position != self.target as f64)
    }

    /// Integrate up to `now`.
    pub fn advance(&mut self, now: Instant) {
        let mut remaining = now.saturating_duration_since(self.last_update);
        self.last_update = now;

        while !remaining.is_zero() && self.is_moving() {
            let dt = remaining.min(STEP);
            self.step(dt.as_secs_f64());
            remaining -= dt;
        }
    }

    fn step(&mut self, dt: f64) {
        let target = self.target as f64;
        let error = target - self.position;
        let max_vel = self.velocity_limit;
        let max_acc = self.acceleration;

        if max_vel <= 0.0 || max_acc <= 0.0 {
            // Stalled: no motion possible with a zero limit
            self.velocity = 0.0;
            return;
        }

        // Decelerate once inside the stopping distance
        let stopping_distance = self.velocity * self.velocity / (2.0 * max_acc);
        let desired_velocity = if error.abs() <= stopping_distance {
            error.signum() * (2.0 * max_acc * error.abs()).sqrt().min(max_vel)
        } else {
            error.signum() * max_vel
        };

        let max_vel_change = max_acc * dt;
        self.velocity += (desired_velocity - self.velocity).clamp(-max_vel_change, max_vel_change);
        self.velocity = self.velocity.clamp(-max_vel, max_vel);

        let delta = self.velocity * dt;
        let arrives =
            delta != 0.0 && delta.signum() == error.signum() && delta.abs() >= error.abs();
        if arrives || error.abs() < f64::EPSILON {
            self.position = target;
            self.velocity = 0.0;
        } else {
            self.position += delta;
        }

        trace!(
            "pos={:.3}, vel={:.3}, target={}, err={:.3}",
            self.position, self.velocity, self.target, error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engaged_axis(now: Instant) -> AxisSimulator {
        let mut axis = AxisSimulator::new(0, now);
        axis.set_acceleration(350_543.0, now);
        axis.set_velocity_limit(230_200.0, now);
        axis.set_engaged(true, now);
        axis
    }

    #[test]
    fn reaches_exact_target() {
        let t0 = Instant::now();
        let mut axis = engaged_axis(t0);
        axis.set_target(5500, t0);

        // Triangular profile for 5500 steps at 350543 steps/s² is ~0.25 s
        assert_eq!(axis.position(t0 + Duration::from_secs(1)), 5500);
        assert!(!axis.is_moving());
        assert_eq!(axis.velocity(), 0.0);
    }

    #[test]
    fn reaches_negative_target() {
        let t0 = Instant::now();
        let mut axis = engaged_axis(t0);
        axis.set_target(-300, t0);
        assert_eq!(axis.position(t0 + Duration::from_secs(1)), -300);
    }

    #[test]
    fn moves_gradually() {
        let t0 = Instant::now();
        let mut axis = engaged_axis(t0);
        axis.set_target(5500, t0);

        let mid = axis.position(t0 + Duration::from_millis(50));
        assert!(mid > 0 && mid < 5500, "mid-move position {mid}");
        assert!(axis.is_moving());
    }

    #[test]
    fn disengaged_axis_does_not_move() {
        let t0 = Instant::now();
        let mut axis = engaged_axis(t0);
        axis.set_engaged(false, t0);
        axis.set_target(100, t0);
        assert_eq!(axis.position(t0 + Duration::from_secs(1)), 0);
        assert!(!axis.is_engaged());
    }

    #[test]
    fn zero_velocity_limit_stalls() {
        let t0 = Instant::now();
        let mut axis = engaged_axis(t0);
        axis.set_velocity_limit(0.0, t0);
        axis.set_target(100, t0);
        assert_eq!(axis.position(t0 + Duration::from_millis(200)), 0);
        assert!(axis.is_moving());
    }

    #[test]
    fn set_position_cancels_motion() {
        let t0 = Instant::now();
        let mut axis = engaged_axis(t0);
        axis.set_target(5000, t0);
        axis.set_position(5500, t0 + Duration::from_millis(10));
        assert!(!axis.is_moving());
        assert_eq!(axis.position(t0 + Duration::from_secs(1)), 5500);
    }
}
