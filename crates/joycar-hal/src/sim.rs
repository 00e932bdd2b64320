//! In-process simulation doubles for headless tests and the demo binary.
//!
//! | Double | Stands in for | Behaviour |
//! |---|---|---|
//! | [`SimClock`] | hardware tick counter | Advanced manually; optional auto-step per read. |
//! | [`SimBus`] | two-wire bus | Records writes and reads, serves queued read data, can be held by a foreign master or fail chosen registers. |
//! | [`RecordingDisplay`] | LED panel | Stores pixels, sensor patterns and repaint count. |
//!
//! Every double is a cheap clone over shared state, so a test keeps one
//! clone for assertions after moving another into the code under test.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use joycar_types::JoyError;

use crate::clock::{Clock, SharedClock, Tick};
use crate::display::{Display, SensorPattern};
use crate::transport::Transport;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─────────────────────────────────────────────────────────────────────────────
// SimClock
// ─────────────────────────────────────────────────────────────────────────────

/// Manually driven tick source.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    ticks: Arc<AtomicU32>,
    auto_step_ms: Arc<AtomicU32>,
}

impl SimClock {
    /// A clock reading 0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: u64) -> Self {
        let clock = Self::new();
        clock.set(ms);
        clock
    }

    /// A [`SharedClock`] reading this clock's state.
    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }

    pub fn set(&self, ms: u64) {
        self.ticks.store(Tick::from_ms(ms).as_ms(), Ordering::SeqCst);
    }

    pub fn advance_by(&self, delta_ms: i32) {
        let _ = self
            .ticks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| {
                Some(Tick::from_ms(u64::from(raw)).add_ms(delta_ms).as_ms())
            });
    }

    /// Advance by `step_ms` after every [`Clock::now`] read, so polling
    /// loops observe time passing.  0 disables auto-stepping.
    pub fn set_auto_step(&self, step_ms: u32) {
        self.auto_step_ms.store(step_ms, Ordering::SeqCst);
    }

    pub fn peek(&self) -> Tick {
        Tick::from_ms(u64::from(self.ticks.load(Ordering::SeqCst)))
    }
}

impl Clock for SimClock {
    fn now(&self) -> Tick {
        let step = self.auto_step_ms.load(Ordering::SeqCst) as i32;
        let previous = self
            .ticks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| {
                (step != 0).then(|| Tick::from_ms(u64::from(raw)).add_ms(step).as_ms())
            })
            .unwrap_or_else(|raw| raw);
        Tick::from_ms(u64::from(previous))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SimBus
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct SimBusState {
    locked: bool,
    contended: bool,
    acquisitions: usize,
    releases: usize,
    writes: Vec<(u8, Vec<u8>)>,
    reads: Vec<(u8, usize)>,
    read_queue: VecDeque<Vec<u8>>,
    failing_registers: HashSet<u8>,
    failing_addresses: HashSet<u8>,
    devices: BTreeSet<u8>,
}

impl SimBusState {
    fn check(&self, address: u8, first_byte: Option<u8>) -> Result<(), JoyError> {
        if self.failing_addresses.contains(&address) {
            return Err(JoyError::Transport {
                address,
                details: "simulated device fault".to_string(),
            });
        }
        if let Some(register) = first_byte
            && self.failing_registers.contains(&register)
        {
            return Err(JoyError::Transport {
                address,
                details: format!("simulated fault on register 0x{register:02X}"),
            });
        }
        Ok(())
    }

    fn fill(&mut self, address: u8, buffer: &mut [u8]) {
        self.reads.push((address, buffer.len()));
        let data = self.read_queue.pop_front().unwrap_or_default();
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = data.get(i).copied().unwrap_or(0);
        }
    }
}

/// Simulated bus with a JoyCar's two devices (0x38 and 0x62) attached.
#[derive(Debug, Clone)]
pub struct SimBus {
    state: Arc<Mutex<SimBusState>>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimBusState {
                locked: false,
                contended: false,
                acquisitions: 0,
                releases: 0,
                writes: Vec::new(),
                reads: Vec::new(),
                read_queue: VecDeque::new(),
                failing_registers: HashSet::new(),
                failing_addresses: HashSet::new(),
                devices: BTreeSet::from([0x38, 0x62]),
            })),
        }
    }

    /// Queue the bytes returned by the next read.  Reads with an empty queue
    /// return zeros.
    pub fn queue_read(&self, data: impl Into<Vec<u8>>) {
        lock(&self.state).read_queue.push_back(data.into());
    }

    /// Simulate another bus master holding the bus.
    pub fn set_contended(&self, contended: bool) {
        lock(&self.state).contended = contended;
    }

    /// Fail every write (and register read) whose first byte is `register`.
    pub fn fail_register(&self, register: u8) {
        lock(&self.state).failing_registers.insert(register);
    }

    /// Fail every transfer addressed to `address`.
    pub fn fail_address(&self, address: u8) {
        lock(&self.state).failing_addresses.insert(address);
    }

    pub fn clear_faults(&self) {
        let mut state = lock(&self.state);
        state.failing_registers.clear();
        state.failing_addresses.clear();
    }

    /// Every successful write as `(address, bytes)`, oldest first.
    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        lock(&self.state).writes.clone()
    }

    pub fn last_write(&self) -> Option<(u8, Vec<u8>)> {
        lock(&self.state).writes.last().cloned()
    }

    pub fn clear_writes(&self) {
        lock(&self.state).writes.clear();
    }

    /// Every read as `(address, length)`, oldest first.
    pub fn reads(&self) -> Vec<(u8, usize)> {
        lock(&self.state).reads.clone()
    }

    pub fn is_locked(&self) -> bool {
        lock(&self.state).locked
    }

    pub fn acquisitions(&self) -> usize {
        lock(&self.state).acquisitions
    }

    pub fn releases(&self) -> usize {
        lock(&self.state).releases
    }
}

impl Transport for SimBus {
    fn try_acquire(&mut self) -> bool {
        let mut state = lock(&self.state);
        if state.locked || state.contended {
            return false;
        }
        state.locked = true;
        state.acquisitions += 1;
        true
    }

    fn release(&mut self) {
        let mut state = lock(&self.state);
        state.locked = false;
        state.releases += 1;
    }

    fn read(&mut self, address: u8, len: usize) -> Result<Vec<u8>, JoyError> {
        let mut state = lock(&self.state);
        state.check(address, None)?;
        let mut buffer = vec![0u8; len];
        state.fill(address, &mut buffer);
        Ok(buffer)
    }

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), JoyError> {
        let mut state = lock(&self.state);
        state.check(address, bytes.first().copied())?;
        state.writes.push((address, bytes.to_vec()));
        Ok(())
    }

    fn write_then_read(
        &mut self,
        address: u8,
        out: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), JoyError> {
        let mut state = lock(&self.state);
        state.check(address, out.first().copied())?;
        state.writes.push((address, out.to_vec()));
        state.fill(address, buffer);
        Ok(())
    }

    fn scan(&mut self) -> Result<Vec<u8>, JoyError> {
        Ok(lock(&self.state).devices.iter().copied().collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RecordingDisplay
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct DisplayState {
    pixels: HashMap<(u8, u8), u8>,
    patterns: Vec<SensorPattern>,
    repaints: usize,
}

/// Display double that remembers everything drawn on it.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pixel(&self, col: u8, row: u8) -> Option<u8> {
        lock(&self.state).pixels.get(&(col, row)).copied()
    }

    /// Sensor patterns shown so far, oldest first.
    pub fn patterns(&self) -> Vec<SensorPattern> {
        lock(&self.state).patterns.clone()
    }

    pub fn repaint_count(&self) -> usize {
        lock(&self.state).repaints
    }
}

impl Display for RecordingDisplay {
    fn set_pixel(&mut self, col: u8, row: u8, intensity: u8) {
        lock(&self.state).pixels.insert((col, row), intensity);
    }

    fn show_sensor_pattern(&mut self, pattern: &SensorPattern, high: u8, low: u8) {
        lock(&self.state).patterns.push(*pattern);
        for (col, row, intensity) in pattern.pixels(high, low) {
            self.set_pixel(col, row, intensity);
        }
    }

    fn repaint(&mut self) {
        lock(&self.state).repaints += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_clock_advances_and_wraps() {
        let clock = SimClock::starting_at(u64::from(crate::clock::TICKS_PERIOD) - 1);
        clock.advance_by(2);
        assert_eq!(clock.now().as_ms(), 1);
    }

    #[test]
    fn sim_clock_auto_step_moves_after_each_read() {
        let clock = SimClock::new();
        clock.set_auto_step(3);
        assert_eq!(clock.now().as_ms(), 0);
        assert_eq!(clock.now().as_ms(), 3);
        assert_eq!(clock.peek().as_ms(), 6);
        clock.set_auto_step(0);
        assert_eq!(clock.now().as_ms(), 6);
        assert_eq!(clock.now().as_ms(), 6);
    }

    #[test]
    fn shared_clock_sees_manual_advances() {
        let clock = SimClock::new();
        let shared = clock.shared();
        clock.advance_by(42);
        assert_eq!(shared.now().as_ms(), 42);
    }

    #[test]
    fn sim_bus_serves_queued_reads_then_zeros() {
        let mut bus = SimBus::new();
        bus.queue_read(vec![0xAB, 0xCD]);
        assert_eq!(bus.read(0x38, 1).unwrap(), vec![0xAB]);
        assert_eq!(bus.read(0x38, 2).unwrap(), vec![0, 0]);
        assert_eq!(bus.reads(), vec![(0x38, 1), (0x38, 2)]);
    }

    #[test]
    fn sim_bus_lock_is_exclusive() {
        let mut bus = SimBus::new();
        assert!(bus.try_acquire());
        assert!(!bus.try_acquire());
        bus.release();
        assert!(bus.try_acquire());
    }

    #[test]
    fn sim_bus_register_fault_only_hits_that_register() {
        let mut bus = SimBus::new();
        bus.fail_register(0x02);
        assert!(bus.write(0x62, &[0x02, 0]).is_err());
        bus.write(0x62, &[0x04, 0]).unwrap();
        assert_eq!(bus.writes(), vec![(0x62, vec![0x04, 0])]);
        bus.clear_faults();
        bus.write(0x62, &[0x02, 0]).unwrap();
    }

    #[test]
    fn sim_bus_address_fault() {
        let mut bus = SimBus::new();
        bus.fail_address(0x38);
        assert!(matches!(
            bus.read(0x38, 1),
            Err(JoyError::Transport { address: 0x38, .. })
        ));
    }

    #[test]
    fn recording_display_tracks_repaints() {
        let mut display = RecordingDisplay::new();
        let observer = display.clone();
        display.set_pixel(1, 2, 9);
        display.repaint();
        assert_eq!(observer.pixel(1, 2), Some(9));
        assert_eq!(observer.repaint_count(), 1);
    }
}
