//! The timer form of tick scheduling: a repeating deadline with a
//! mutable interval.
//!
//! [`TickTimer`] does not spawn anything itself — the loop thread asks it
//! how long to wait ([`time_until_fire`](TickTimer::time_until_fire)) and
//! tells it when a fire happened
//! ([`rearm_after_fire`](TickTimer::rearm_after_fire)). A zero interval
//! means "never fire automatically": ticks then occur only when an engine
//! operation requests one explicitly.

use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};

// ── TimerError ──────────────────────────────────────────────────

/// Misuse of the tick timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerError {
    /// `start()` was called while the timer was already armed. The timer
    /// must be stopped before it can be restarted.
    AlreadyArmed,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyArmed => write!(f, "tick timer is already armed"),
        }
    }
}

impl Error for TimerError {}

// ── TickTimer ───────────────────────────────────────────────────

/// Repeating tick deadline with a live-reconfigurable interval.
#[derive(Debug)]
pub struct TickTimer {
    interval: Duration,
    armed: bool,
    next_fire: Option<Instant>,
}

impl TickTimer {
    /// Create a disarmed timer with the given interval in milliseconds.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            armed: false,
            next_fire: None,
        }
    }

    /// Arm the timer: the first fire is due one interval from now.
    ///
    /// With a zero interval the timer stays disarmed and returns
    /// normally — manual-tick-only mode.
    ///
    /// # Errors
    ///
    /// [`TimerError::AlreadyArmed`] if the timer is armed; it must be
    /// stopped before restarting.
    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.armed {
            return Err(TimerError::AlreadyArmed);
        }
        if self.interval.is_zero() {
            return Ok(());
        }
        self.armed = true;
        self.next_fire = Some(Instant::now() + self.interval);
        Ok(())
    }

    /// Disarm the timer and cancel the pending deadline. Safe to call
    /// when already disarmed.
    pub fn stop(&mut self) {
        self.armed = false;
        self.next_fire = None;
    }

    /// Replace the interval: stop, swap, then restart if the timer was
    /// armed — one atomic step from the loop thread's point of view, so
    /// there is never an overlapping deadline or a missed disarm.
    ///
    /// Armed/disarmed status is preserved, except that updating an armed
    /// timer to a zero interval disarms it (zero never arms).
    pub fn update_interval(&mut self, interval_ms: u64) {
        let was_armed = self.armed;
        self.stop();
        self.interval = Duration::from_millis(interval_ms);
        if was_armed {
            // Cannot fail: the timer was just disarmed.
            let _ = self.start();
        }
    }

    /// Schedule the next fire after one just happened.
    pub fn rearm_after_fire(&mut self, now: Instant) {
        if self.armed {
            self.next_fire = Some(now + self.interval);
        }
    }

    /// How long until the next fire, or `None` when disarmed.
    ///
    /// Returns `Duration::ZERO` when the deadline has already passed.
    pub fn time_until_fire(&self, now: Instant) -> Option<Duration> {
        self.next_fire
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Whether the timer is armed.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// The configured interval in milliseconds.
    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }
}
