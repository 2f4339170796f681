//! Idle watchdog.
//!
//! A background thread that fires every `period` and disengages the motor
//! once no move has been initiated for longer than `idle_timeout`. The
//! firing never waits on the controller: if a command holds the motor state,
//! the axis is in use and the firing is skipped.
//!
//! # Lifecycle
//!
//! 1. `IdleWatchdog::start()` - spawn the thread, returns a `WatchdogHandle`
//! 2. each firing runs [`IdleWatchdog::check`]
//! 3. `WatchdogHandle::stop()` (or drop) - wake and join the thread

use crate::controller::MotorController;
use crate::error::ControlError;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use stepctl_common::config::WatchdogConfig;
use tracing::{debug, error, info};

/// Result of one idle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogOutcome {
    /// A move happened recently enough.
    Active {
        /// Time since the last move was initiated.
        idle_for: Duration,
    },
    /// Idle timeout exceeded, motor disengaged.
    Disengaged {
        /// Time since the last move was initiated.
        idle_for: Duration,
    },
    /// A command holds the motor state; nothing checked.
    Busy,
    /// Controller already shut down.
    Closed,
}

/// Periodic idle check bound to a controller.
pub struct IdleWatchdog {
    controller: Arc<MotorController>,
    idle_timeout: Duration,
    period: Duration,
}

impl IdleWatchdog {
    /// Build from the watchdog configuration section.
    pub fn new(controller: Arc<MotorController>, config: &WatchdogConfig) -> Self {
        Self::with_timing(controller, config.idle_timeout(), config.period())
    }

    /// Build with explicit timing.
    pub fn with_timing(
        controller: Arc<MotorController>,
        idle_timeout: Duration,
        period: Duration,
    ) -> Self {
        Self {
            controller,
            idle_timeout,
            period,
        }
    }

    /// Inactivity after which the motor is disengaged.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Interval between firings.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one idle check as of `now`.
    ///
    /// Disengages when the time since the last move strictly exceeds the
    /// idle timeout. The target position is never touched.
    pub fn check(&self, now: Instant) -> Result<WatchdogOutcome, ControlError> {
        let Some(mut state) = self.controller.try_state() else {
            debug!("Watchdog: motor busy, skipping");
            return Ok(WatchdogOutcome::Busy);
        };
        if state.is_closed() {
            return Ok(WatchdogOutcome::Closed);
        }

        let idle_for = now.saturating_duration_since(state.last_motion());
        debug!(
            engaged = state.is_engaged(),
            "Watchdog: idle for {:.1}s",
            idle_for.as_secs_f64()
        );
        if idle_for > self.idle_timeout {
            info!("Stepper idle for {:.0}s, disengaging", idle_for.as_secs_f64());
            state.idle_disengage(self.controller.motor())?;
            return Ok(WatchdogOutcome::Disengaged { idle_for });
        }
        Ok(WatchdogOutcome::Active { idle_for })
    }

    /// Spawn the background thread.
    pub fn start(self) -> io::Result<WatchdogHandle> {
        let signal = Arc::new(StopSignal::default());
        let stats = Arc::new(WatchdogStats::default());

        info!(
            "Starting idle watchdog (timeout={:?}, period={:?})",
            self.idle_timeout, self.period
        );

        let thread = {
            let signal = Arc::clone(&signal);
            let stats = Arc::clone(&stats);
            thread::Builder::new()
                .name("idle-watchdog".to_string())
                .spawn(move || self.run(&signal, &stats))?
        };

        Ok(WatchdogHandle {
            signal,
            stats,
            thread: Some(thread),
        })
    }

    fn run(&self, signal: &StopSignal, stats: &WatchdogStats) {
        let mut deadline = Instant::now() + self.period;
        let mut stopped = signal.stopped.lock();

        loop {
            if *stopped {
                break;
            }
            if !signal.wake.wait_until(&mut stopped, deadline).timed_out() {
                // Stop request or spurious wakeup
                continue;
            }
            deadline += self.period;

            MutexGuard::unlocked(&mut stopped, || {
                stats.firings.fetch_add(1, Ordering::Relaxed);
                match self.check(Instant::now()) {
                    Ok(WatchdogOutcome::Disengaged { .. }) => {
                        stats.disengages.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(_) => {}
                    Err(e) => error!("Watchdog disengage failed ({}): {}", e.code(), e),
                }
            });
        }
        debug!("Idle watchdog stopped");
    }
}

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

#[derive(Default)]
struct WatchdogStats {
    firings: AtomicU64,
    disengages: AtomicU64,
}

/// Handle to a running watchdog thread. Dropping it stops the thread.
pub struct WatchdogHandle {
    signal: Arc<StopSignal>,
    stats: Arc<WatchdogStats>,
    thread: Option<JoinHandle<()>>,
}

impl WatchdogHandle {
    /// Number of firings so far.
    pub fn firings(&self) -> u64 {
        self.stats.firings.load(Ordering::Relaxed)
    }

    /// Number of firings that disengaged the motor.
    pub fn disengages(&self) -> u64 {
        self.stats.disengages.load(Ordering::Relaxed)
    }

    /// Returns true until the thread has been stopped.
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        *self.signal.stopped.lock() = true;
        self.signal.wake.notify_all();
        if thread.join().is_err() {
            error!("Idle watchdog thread panicked");
        }
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.stop_inner();
    }
}
