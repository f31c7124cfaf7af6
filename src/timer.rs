//! Restartable, bounded monotonic stopwatch.
//!
//! [`Timer`] measures elapsed recording time and detects interval timeouts.
//! A timer carries a *budget* in nanoseconds; a negative budget means
//! "unbounded" — [`Timer::is_finished`] then never returns `true`.
//!
//! The timer has no explicit stop method.  Callers simply stop polling
//! `is_finished()`; [`Timer::runtime`] stays valid afterwards and reports
//! elapsed time since the last [`Timer::start`].

use std::time::{Duration, Instant};

use thiserror::Error;

// ---------------------------------------------------------------------------
// TimerError
// ---------------------------------------------------------------------------

/// Errors raised by [`Timer`].
#[derive(Debug, Clone, Error)]
pub enum TimerError {
    /// [`Timer::reset`] was called between `start()` and the budget expiring.
    /// Changing the timing policy mid-run is not allowed.
    #[error("timer is still running — cannot reset the budget mid-run")]
    StillRunning,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// A restartable stopwatch with an optional time budget.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use speech_relay::timer::Timer;
///
/// let mut timer = Timer::new(Duration::from_secs(2));
/// assert!(!timer.is_finished()); // never started
///
/// timer.start();
/// assert!(!timer.is_finished()); // 2 s have not elapsed
/// assert!(timer.runtime() < Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct Timer {
    /// Epoch of the current run; `None` until the first `start()`.
    saved_time: Option<Instant>,
    /// Budget in nanoseconds; negative means unbounded.
    total_nanos: i64,
}

impl Timer {
    /// Create a timer with the given budget.  The timer is not started.
    pub fn new(total: Duration) -> Self {
        Self {
            saved_time: None,
            total_nanos: total.as_nanos().min(i64::MAX as u128) as i64,
        }
    }

    /// Create a timer that never finishes.
    pub fn unbounded() -> Self {
        Self {
            saved_time: None,
            total_nanos: -1,
        }
    }

    /// Create a timer from a budget in (possibly fractional) seconds.
    ///
    /// Values `<= 0.0` produce an unbounded timer, matching the
    /// configuration convention used throughout the crate.
    pub fn from_secs_or_unbounded(secs: f32) -> Self {
        if secs <= 0.0 {
            Self::unbounded()
        } else {
            Self::new(Duration::from_secs_f32(secs))
        }
    }

    /// Record the current monotonic time as the epoch for this run.
    ///
    /// Calling `start()` again restarts the run (the previous epoch is
    /// discarded), which is how the controller extends a session past a
    /// timeout.
    pub fn start(&mut self) {
        self.saved_time = Some(Instant::now());
    }

    /// `true` iff the timer has a budget and the elapsed time since the last
    /// `start()` exceeds it.
    ///
    /// Returns `false` when the timer was never started or is unbounded.
    /// Monotonic non-decreasing between restarts.
    pub fn is_finished(&self) -> bool {
        if self.total_nanos < 0 {
            return false;
        }
        match self.saved_time {
            Some(epoch) => epoch.elapsed().as_nanos() > self.total_nanos as u128,
            None => false,
        }
    }

    /// `true` once `start()` has been called at least once.
    pub fn is_started(&self) -> bool {
        self.saved_time.is_some()
    }

    /// Elapsed time since the last `start()`, or zero if never started.
    ///
    /// Valid even after `is_finished()` turned `true` — there is no stop.
    pub fn runtime(&self) -> Duration {
        self.saved_time.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    /// Install a new budget and clear the epoch.
    ///
    /// # Errors
    ///
    /// [`TimerError::StillRunning`] when the timer has been started and its
    /// budget has not yet expired — the budget cannot change mid-run.
    pub fn reset(&mut self, new_total: Duration) -> Result<(), TimerError> {
        self.reset_nanos(new_total.as_nanos().min(i64::MAX as u128) as i64)
    }

    /// Remove the budget entirely (the timer never finishes) and clear the
    /// epoch.
    ///
    /// # Errors
    ///
    /// [`TimerError::StillRunning`] under the same mid-run rule as
    /// [`Timer::reset`].
    pub fn reset_unbounded(&mut self) -> Result<(), TimerError> {
        self.reset_nanos(-1)
    }

    fn reset_nanos(&mut self, total_nanos: i64) -> Result<(), TimerError> {
        if self.is_started() && !self.is_finished() {
            return Err(TimerError::StillRunning);
        }
        self.total_nanos = total_nanos;
        self.saved_time = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
