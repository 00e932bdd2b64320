//! [`JoyCarRobot`] – top-level controller tying sensors, wheels and the
//! display together.
//!
//! One call to [`JoyCarRobot::update`] is one control cycle:
//!
//! 1. poll the sensors (every `sensor_poll_ms`) and redraw on change,
//! 2. advance both wheels' pending commands,
//! 3. hint the display to repaint.
//!
//! # Example
//!
//! ```rust
//! use joycar_drive::JoyCarRobot;
//! use joycar_hal::NullDisplay;
//! use joycar_hal::sim::{SimBus, SimClock};
//! use joycar_types::RobotConfig;
//!
//! let clock = SimClock::new();
//! let mut robot = JoyCarRobot::new(
//!     Box::new(SimBus::new()),
//!     clock.shared(),
//!     Box::new(NullDisplay),
//!     &RobotConfig::default(),
//! )
//! .unwrap();
//!
//! robot.wheels_mut().set_velocity(0.1, 0.0).unwrap();
//! robot.update().unwrap();
//! robot.stop().unwrap();
//! ```

use std::sync::Arc;

use joycar_hal::display::{SENSOR_HIGH, SENSOR_LOW};
use joycar_hal::{BusLock, Display, InputExpander, PwmDriver, SharedClock, Transport};
use joycar_types::{JoyError, RobotConfig};
use tracing::{info, warn};

use crate::sensors::SensorBank;
use crate::wheels::Wheels;

pub struct JoyCarRobot {
    sensors: SensorBank,
    wheels: Wheels,
    display: Box<dyn Display>,
}

impl JoyCarRobot {
    /// Bring up both devices on `transport`, serialised by a [`BusLock`]
    /// bounded by `config.lock_timeout_ms`.
    ///
    /// The configuration is validated before anything touches the bus.  The
    /// sensors are read once and shown, and the motor driver outputs are
    /// configured.
    pub fn new(
        transport: Box<dyn Transport>,
        clock: SharedClock,
        mut display: Box<dyn Display>,
        config: &RobotConfig,
    ) -> Result<Self, JoyError> {
        config.validate()?;

        let bus = BusLock::new(transport, Arc::clone(&clock), config.lock_timeout_ms);
        let expander = InputExpander::new(bus.clone(), config.expander_address);
        let driver = Arc::new(PwmDriver::new(bus, config.pwm_address));

        let sensors = SensorBank::new(expander, Arc::clone(&clock), config.sensor_poll_ms)?;
        let wheels = Wheels::new(driver, clock, config)?;
        display.show_sensor_pattern(&sensors.pattern(), SENSOR_HIGH, SENSOR_LOW);

        info!(
            wheel_diameter_m = config.wheel_diameter_m,
            wheel_base_m = config.wheel_base_m,
            "JoyCar ready"
        );
        Ok(Self {
            sensors,
            wheels,
            display,
        })
    }

    /// Run one control cycle.
    ///
    /// The wheels are advanced even when the sensor poll fails, so a bad
    /// read never stalls a pending stop.  The first failure is returned.
    pub fn update(&mut self) -> Result<(), JoyError> {
        let sensed = self.sensors.update(self.display.as_mut());
        if let Err(err) = &sensed {
            warn!(error = %err, "sensor poll failed");
        }
        let driven = self.wheels.update();
        self.display.repaint();

        sensed?;
        driven
    }

    /// Stop both wheels.  Reversal-free, so it takes effect immediately.
    pub fn stop(&mut self) -> Result<(), JoyError> {
        self.wheels.stop()
    }

    /// See [`Wheels::emergency_shutdown`].
    pub fn emergency_shutdown(&mut self) -> Result<(), JoyError> {
        self.wheels.emergency_shutdown()
    }

    pub fn sensors(&self) -> &SensorBank {
        &self.sensors
    }

    pub fn wheels(&self) -> &Wheels {
        &self.wheels
    }

    pub fn wheels_mut(&mut self) -> &mut Wheels {
        &mut self.wheels
    }
}
