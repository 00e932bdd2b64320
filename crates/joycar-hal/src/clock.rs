//! Wrapping millisecond ticks and the [`Clock`] boundary.
//!
//! The hardware counter wraps at [`TICKS_PERIOD`] (2^29 ms, roughly six
//! days).  Consumers never subtract raw values; they go through
//! [`Tick::diff`], which folds the difference back into the signed half
//! period so that a deadline straddling the wrap point still compares
//! correctly.
//!
//! # Example
//!
//! ```rust
//! use joycar_hal::clock::{Tick, TICKS_PERIOD};
//!
//! let late = Tick::from_ms(u64::from(TICKS_PERIOD) - 10);
//! let wrapped = late.add_ms(30);
//! assert_eq!(wrapped.as_ms(), 20);
//! assert_eq!(wrapped.diff(late), 30);
//! assert!(late.less(wrapped));
//! ```

use std::sync::Arc;
use std::time::Instant;

/// Modulus of the tick counter.
pub const TICKS_PERIOD: u32 = 1 << 29;
const TICKS_MAX: u32 = TICKS_PERIOD - 1;
const TICKS_HALF_PERIOD: u32 = TICKS_PERIOD / 2;

/// A millisecond counter value, always in `0..TICKS_PERIOD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tick(u32);

impl Tick {
    /// Reduce an arbitrary millisecond count into the tick range.
    pub fn from_ms(ms: u64) -> Self {
        Tick((ms % u64::from(TICKS_PERIOD)) as u32)
    }

    pub fn as_ms(self) -> u32 {
        self.0
    }

    /// `self + delta_ms`, wrapping at [`TICKS_PERIOD`].  Negative deltas
    /// move backwards.
    pub fn add_ms(self, delta_ms: i32) -> Tick {
        let sum = i64::from(self.0) + i64::from(delta_ms);
        Tick(sum.rem_euclid(i64::from(TICKS_PERIOD)) as u32)
    }

    /// Signed distance `self - earlier` in milliseconds, re-centred into
    /// `[-TICKS_PERIOD / 2, TICKS_PERIOD / 2)`.
    pub fn diff(self, earlier: Tick) -> i32 {
        let raw = self.0.wrapping_sub(earlier.0) & TICKS_MAX;
        let centred = (raw + TICKS_HALF_PERIOD) & TICKS_MAX;
        centred as i32 - TICKS_HALF_PERIOD as i32
    }

    /// `true` when `self` lies before `other`.
    pub fn less(self, other: Tick) -> bool {
        self.diff(other) < 0
    }
}

/// Monotonic millisecond source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Tick;
}

/// Clock handle shared by every timer and the bus lock.
pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock ticks measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Convenience constructor returning a [`SharedClock`].
    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Tick {
        Tick::from_ms(self.origin.elapsed().as_millis() as u64)
    }
}
