//! [`BusLock`] – scoped, time-bounded access to the shared bus.
//!
//! The sensor expander and the motor PWM driver share one physical bus.  An
//! unserialised second master could interleave with a multi-byte register
//! sequence, so every device operation runs inside
//! [`BusLock::with_lock`]:
//!
//! 1. Try once to take the shared handle and the transport's claim; on
//!    success proceed immediately.
//! 2. Otherwise keep trying until it succeeds or more than `timeout_ms`
//!    ticks have passed, then fail with [`JoyError::LockTimeout`].  Neither
//!    step ever blocks, whether the holder is another master on the wire,
//!    another thread with a clone, or a nested call.
//! 3. Run the body.
//! 4. Release through [`BusGuard`]'s `Drop`, on success, error or panic.
//!
//! # Example
//!
//! ```rust
//! use joycar_hal::bus::BusLock;
//! use joycar_hal::sim::{SimBus, SimClock};
//!
//! let sim = SimBus::new();
//! let bus = BusLock::new(Box::new(sim.clone()), SimClock::new().shared(), 5);
//!
//! bus.with_lock(|t| t.write(0x62, &[0x02, 10])).unwrap();
//! assert_eq!(sim.writes(), vec![(0x62, vec![0x02, 10])]);
//! assert!(!sim.is_locked());
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use joycar_types::JoyError;
use tracing::warn;

use crate::clock::SharedClock;
use crate::transport::Transport;

/// Shared, cloneable handle to the one bus transport.
///
/// All clones refer to the same transport; the expander and PWM driver each
/// hold a clone.
#[derive(Clone)]
pub struct BusLock {
    transport: Arc<Mutex<Box<dyn Transport>>>,
    clock: SharedClock,
    timeout_ms: u32,
}

impl BusLock {
    pub fn new(transport: Box<dyn Transport>, clock: SharedClock, timeout_ms: u32) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            clock,
            timeout_ms,
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Claim the bus, polling for at most `timeout_ms` ticks.
    ///
    /// The shared handle itself is only ever try-locked, so a holder on
    /// another thread (or a nested call on this one) counts as contention
    /// and is bounded by the same timeout.
    ///
    /// # Errors
    ///
    /// [`JoyError::LockTimeout`] when the bus stayed claimed by another
    /// holder; [`JoyError::Transport`] if a previous holder panicked while
    /// using the handle.
    pub fn acquire(&self) -> Result<BusGuard<'_>, JoyError> {
        if let Some(guard) = self.try_claim()? {
            return Ok(guard);
        }

        let start = self.clock.now();
        loop {
            if let Some(guard) = self.try_claim()? {
                return Ok(guard);
            }
            let waited_ms = self.clock.now().diff(start);
            if i64::from(waited_ms) > i64::from(self.timeout_ms) {
                warn!(waited_ms, timeout_ms = self.timeout_ms, "bus lock timeout");
                return Err(JoyError::LockTimeout { waited_ms });
            }
            std::thread::yield_now();
        }
    }

    /// One non-blocking attempt at both the handle and the transport claim.
    fn try_claim(&self) -> Result<Option<BusGuard<'_>>, JoyError> {
        let mut handle = match self.transport.try_lock() {
            Ok(handle) => handle,
            Err(TryLockError::WouldBlock) => return Ok(None),
            Err(TryLockError::Poisoned(_)) => {
                return Err(JoyError::Transport {
                    address: 0,
                    details: "bus handle poisoned by a panicking holder".to_string(),
                });
            }
        };
        if handle.try_acquire() {
            Ok(Some(BusGuard { handle }))
        } else {
            Ok(None)
        }
    }

    /// Run `body` while holding the bus.  The bus is released afterwards
    /// whatever `body` returns.
    pub fn with_lock<T>(
        &self,
        body: impl FnOnce(&mut dyn Transport) -> Result<T, JoyError>,
    ) -> Result<T, JoyError> {
        let mut guard = self.acquire()?;
        body(guard.transport())
    }

    /// List the addresses that answer on the bus.
    pub fn scan(&self) -> Result<Vec<u8>, JoyError> {
        self.with_lock(|bus| bus.scan())
    }
}

impl fmt::Debug for BusLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusLock")
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

/// Proof of bus ownership.  Dropping it releases the bus.
pub struct BusGuard<'a> {
    handle: MutexGuard<'a, Box<dyn Transport>>,
}

impl BusGuard<'_> {
    pub fn transport(&mut self) -> &mut (dyn Transport + 'static) {
        &mut **self.handle
    }
}

impl Drop for BusGuard<'_> {
    fn drop(&mut self) {
        self.handle.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::sim::{SimBus, SimClock};
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn lock_over(sim: &SimBus, clock: &SimClock) -> BusLock {
        BusLock::new(Box::new(sim.clone()), clock.shared(), 5)
    }

    #[test]
    fn body_runs_with_bus_held_and_releases_after() {
        let sim = SimBus::new();
        let bus = lock_over(&sim, &SimClock::new());

        let held = bus.with_lock(|_| Ok(sim.is_locked())).unwrap();
        assert!(held);
        assert!(!sim.is_locked());
        assert_eq!(sim.acquisitions(), 1);
        assert_eq!(sim.releases(), 1);
    }

    #[test]
    fn release_runs_when_body_fails() {
        let sim = SimBus::new();
        let bus = lock_over(&sim, &SimClock::new());

        let result: Result<(), JoyError> = bus.with_lock(|_| {
            Err(JoyError::Transport {
                address: 0x62,
                details: "nack".to_string(),
            })
        });
        assert!(result.is_err());
        assert!(!sim.is_locked());
        assert_eq!(sim.releases(), 1);
    }

    #[test]
    fn contended_bus_times_out_after_bound() {
        let sim = SimBus::new();
        let clock = SimClock::new();
        clock.set_auto_step(1);
        let bus = lock_over(&sim, &clock);
        sim.set_contended(true);

        let result = bus.with_lock(|t| t.write(0x62, &[0x02, 1]));
        assert_eq!(result, Err(JoyError::LockTimeout { waited_ms: 6 }));
        assert!(sim.writes().is_empty(), "no write may be issued");
        assert_eq!(sim.releases(), 0, "a lock never granted is never released");
    }

    #[test]
    fn bus_becomes_usable_once_contention_clears() {
        let sim = SimBus::new();
        let clock = SimClock::new();
        clock.set_auto_step(1);
        let bus = lock_over(&sim, &clock);

        sim.set_contended(true);
        assert!(bus.with_lock(|t| t.write(0x38, &[0xFF])).is_err());
        sim.set_contended(false);
        bus.with_lock(|t| t.write(0x38, &[0xFF])).unwrap();
        assert_eq!(sim.writes(), vec![(0x38, vec![0xFF])]);
    }

    #[test]
    fn clones_share_one_transport() {
        let sim = SimBus::new();
        let bus = lock_over(&sim, &SimClock::new());
        let other = bus.clone();

        bus.with_lock(|t| t.write(0x38, &[1])).unwrap();
        other.with_lock(|t| t.write(0x62, &[2, 3])).unwrap();
        assert_eq!(sim.writes().len(), 2);
        assert_eq!(sim.acquisitions(), 2);
    }

    #[test]
    fn scan_goes_through_the_lock() {
        let sim = SimBus::new();
        let bus = lock_over(&sim, &SimClock::new());
        assert_eq!(bus.scan().unwrap(), vec![0x38, 0x62]);
        assert_eq!(sim.acquisitions(), 1);
    }

    #[test]
    fn holder_on_another_thread_times_out_within_bound() {
        let sim = SimBus::new();
        let bus = BusLock::new(Box::new(sim.clone()), SystemClock::shared(), 5);
        let holder = bus.clone();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (finish_tx, finish_rx) = mpsc::channel::<()>();

        let worker = thread::spawn(move || {
            holder.with_lock(|_| {
                entered_tx.send(()).ok();
                finish_rx.recv().ok();
                Ok(())
            })
        });
        entered_rx.recv().unwrap();

        let started = Instant::now();
        let result = bus.with_lock(|t| t.write(0x62, &[0x02, 0]));
        let waited = started.elapsed();

        finish_tx.send(()).unwrap();
        worker.join().unwrap().unwrap();

        assert!(matches!(result, Err(JoyError::LockTimeout { .. })));
        assert!(waited < Duration::from_millis(100), "waited {waited:?}");
        assert!(sim.writes().is_empty());
        assert!(!sim.is_locked());
    }

    #[test]
    fn nested_lock_times_out_instead_of_deadlocking() {
        let sim = SimBus::new();
        let clock = SimClock::new();
        clock.set_auto_step(1);
        let bus = lock_over(&sim, &clock);

        let inner = bus
            .with_lock(|_| Ok(bus.with_lock(|t| t.write(0x38, &[0]))))
            .unwrap();
        assert!(matches!(inner, Err(JoyError::LockTimeout { .. })));
        assert!(sim.writes().is_empty());
        assert_eq!(sim.releases(), 1);
    }
}
