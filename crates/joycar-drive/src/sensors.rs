//! [`SensorBank`] – line and obstacle sensors behind the PCF8574.
//!
//! The expander port carries five sensor bits.  Line sensors pull their pin
//! high over a dark line, obstacle sensors pull theirs low when something
//! is close.  The line bits are inverted on read so that every sensor
//! reads **0 when active**:
//!
//! ```text
//!   bit  6          5          4       3        2
//!        obstacle R obstacle L line R  line M   line L
//! ```
//!
//! ```rust
//! use joycar_drive::sensors::{SensorBank, LINE_ALL, LINE_LEFT};
//! use joycar_hal::{BusLock, InputExpander};
//! use joycar_hal::sim::{SimBus, SimClock};
//!
//! let sim = SimBus::new();
//! sim.queue_read(vec![0b0000_0100]);
//! let clock = SimClock::new();
//! let bus = BusLock::new(Box::new(sim), clock.shared(), 5);
//! let sensors = SensorBank::new(InputExpander::new(bus, 0x38), clock.shared(), 50).unwrap();
//!
//! assert!(sensors.is_active(LINE_LEFT));
//! assert!(sensors.any_active(LINE_ALL));
//! ```

use joycar_hal::display::{SENSOR_HIGH, SENSOR_LOW};
use joycar_hal::{Display, InputExpander, PeriodicTimer, SensorPattern, SharedClock};
use joycar_types::JoyError;
use tracing::{debug, trace};

pub const OBSTACLE_RIGHT: u8 = 0x40;
pub const OBSTACLE_LEFT: u8 = 0x20;
pub const LINE_RIGHT: u8 = 0x10;
pub const LINE_MIDDLE: u8 = 0x08;
pub const LINE_LEFT: u8 = 0x04;
pub const LINE_ALL: u8 = LINE_LEFT | LINE_MIDDLE | LINE_RIGHT;

/// Bits inverted on read so all sensors share the same polarity.
const POLARITY_MASK: u8 = LINE_ALL;

#[derive(Debug)]
pub struct SensorBank {
    expander: InputExpander,
    poll_timer: PeriodicTimer,
    raw: u8,
    previous_raw: Option<u8>,
}

impl SensorBank {
    /// Create the bank and take an initial reading, so the state is valid
    /// before the first poll period elapses.
    pub fn new(
        expander: InputExpander,
        clock: SharedClock,
        poll_period_ms: u32,
    ) -> Result<Self, JoyError> {
        let raw = expander.read_port()? ^ POLARITY_MASK;
        Ok(Self {
            expander,
            poll_timer: PeriodicTimer::new(clock, poll_period_ms),
            raw,
            previous_raw: None,
        })
    }

    /// Read the port now, regardless of the poll period.  Returns `true`
    /// when the value differs from the previous reading.
    pub fn poll(&mut self) -> Result<bool, JoyError> {
        let raw = self.expander.read_port()? ^ POLARITY_MASK;
        let changed = raw != self.raw;
        self.previous_raw = Some(self.raw);
        self.raw = raw;
        trace!(raw, changed, "sensor port polled");
        Ok(changed)
    }

    /// Poll if the period has elapsed and push a changed pattern to
    /// `display`.  Returns whether the reading changed.
    ///
    /// A failed read is returned; the period is already re-armed, so the
    /// next attempt happens one period later.
    pub fn update(&mut self, display: &mut dyn Display) -> Result<bool, JoyError> {
        if !self.poll_timer.due(None) {
            return Ok(false);
        }
        let changed = self.poll()?;
        if changed {
            debug!(raw = self.raw, "sensor state changed");
            display.show_sensor_pattern(&self.pattern(), SENSOR_HIGH, SENSOR_LOW);
        }
        Ok(changed)
    }

    /// Normalised port value.
    pub fn raw(&self) -> u8 {
        self.raw
    }

    /// Normalised value before the latest poll, if any poll has happened.
    pub fn previous_raw(&self) -> Option<u8> {
        self.previous_raw
    }

    pub fn sensor_data(&self, mask: u8) -> u8 {
        self.raw & mask
    }

    /// `true` when every sensor in `mask` is active.
    pub fn is_active(&self, mask: u8) -> bool {
        self.sensor_data(mask) == 0
    }

    /// `true` when at least one sensor in `mask` is active.
    pub fn any_active(&self, mask: u8) -> bool {
        self.sensor_data(mask) != mask
    }

    /// Current state laid out for a [`Display`].  The JoyCar has no far or
    /// middle-left/right line sensors; those positions stay `None`.
    pub fn pattern(&self) -> SensorPattern {
        SensorPattern {
            obstacle_left: Some(self.is_active(OBSTACLE_LEFT)),
            left: Some(self.is_active(LINE_LEFT)),
            middle: Some(self.is_active(LINE_MIDDLE)),
            right: Some(self.is_active(LINE_RIGHT)),
            obstacle_right: Some(self.is_active(OBSTACLE_RIGHT)),
            ..SensorPattern::default()
        }
    }
}
