//! One-shot [`Timer`] and self-rearming [`PeriodicTimer`].
//!
//! Both read "now" from the injected [`SharedClock`] unless the caller
//! passes an explicit tick, which lets a control cycle evaluate several
//! timers against one consistent instant.
//!
//! A started timer without a duration is immediately expired (the duration
//! falls back to 0).  A stopped timer never expires.
//!
//! # Example
//!
//! ```rust
//! use joycar_hal::sim::SimClock;
//! use joycar_hal::timer::PeriodicTimer;
//!
//! let clock = SimClock::new();
//! let mut poll = PeriodicTimer::new(clock.shared(), 50);
//!
//! clock.advance_by(49);
//! assert!(!poll.due(None));
//! clock.advance_by(1);
//! assert!(poll.due(None));
//! assert!(!poll.due(None)); // re-armed at the instant it fired
//! ```

use std::fmt;

use crate::clock::{SharedClock, Tick};

/// A one-shot deadline measured from the instant it was started.
pub struct Timer {
    clock: SharedClock,
    started_at: Option<Tick>,
    duration_ms: Option<u32>,
}

impl Timer {
    /// Create a stopped timer.
    pub fn new(clock: SharedClock, duration_ms: Option<u32>) -> Self {
        Self {
            clock,
            started_at: None,
            duration_ms,
        }
    }

    /// Create a timer already started at the current tick.
    pub fn started(clock: SharedClock, duration_ms: Option<u32>) -> Self {
        let mut timer = Self::new(clock, duration_ms);
        timer.start(None, None);
        timer
    }

    /// Start (or restart) at `at`, defaulting to now.  A `duration_ms` of
    /// `Some` replaces the stored duration.
    pub fn start(&mut self, at: Option<Tick>, duration_ms: Option<u32>) {
        if duration_ms.is_some() {
            self.duration_ms = duration_ms;
        }
        self.started_at = Some(self.resolve(at));
    }

    pub fn stop(&mut self) {
        self.started_at = None;
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn duration_ms(&self) -> Option<u32> {
        self.duration_ms
    }

    /// Signed milliseconds since the start, or `None` when stopped.
    pub fn elapsed(&self, at: Option<Tick>) -> Option<i32> {
        let started_at = self.started_at?;
        Some(self.resolve(at).diff(started_at))
    }

    /// `true` once at least the duration has passed since the start.
    ///
    /// `duration_ms` overrides the stored duration for this query only.
    pub fn is_expired(&self, at: Option<Tick>, duration_ms: Option<u32>) -> bool {
        match self.elapsed(at) {
            None => false,
            Some(elapsed) => {
                let limit = duration_ms.or(self.duration_ms).unwrap_or(0);
                i64::from(elapsed) >= i64::from(limit)
            }
        }
    }

    fn resolve(&self, at: Option<Tick>) -> Tick {
        at.unwrap_or_else(|| self.clock.now())
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("started_at", &self.started_at)
            .field("duration_ms", &self.duration_ms)
            .finish_non_exhaustive()
    }
}

/// A repeating deadline that re-arms itself each time it fires.
#[derive(Debug)]
pub struct PeriodicTimer {
    timer: Timer,
}

impl PeriodicTimer {
    /// Create a periodic timer whose first period starts now.
    pub fn new(clock: SharedClock, period_ms: u32) -> Self {
        Self {
            timer: Timer::started(clock, Some(period_ms)),
        }
    }

    pub fn period_ms(&self) -> u32 {
        self.timer.duration_ms().unwrap_or(0)
    }

    /// Return `true` when a full period has elapsed, restarting the period
    /// at `at` (or now) in that case.
    pub fn due(&mut self, at: Option<Tick>) -> bool {
        let at = self.timer.resolve(at);
        let fired = self.timer.is_expired(Some(at), None);
        if fired {
            self.timer.start(Some(at), None);
        }
        fired
    }

    /// Begin a fresh period at `at` (or now) without firing.
    pub fn reset(&mut self, at: Option<Tick>) {
        self.timer.start(at, None);
    }
}
