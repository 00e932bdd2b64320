//! `joycar-drive` – motion control for the JoyCar robot.
//!
//! # Modules
//!
//! - [`wheel`] – a single [`Wheel`][wheel::Wheel] with deadzone, clamping and
//!   the direction-reversal interlock.
//! - [`wheels`] – the differential pair and emergency shutdown.
//! - [`sensors`] – the line/obstacle [`SensorBank`][sensors::SensorBank].
//! - [`robot`] – [`JoyCarRobot`], the per-cycle controller.

pub mod robot;
pub mod sensors;
pub mod wheel;
pub mod wheels;

pub use robot::JoyCarRobot;
pub use sensors::SensorBank;
pub use wheel::Wheel;
pub use wheels::Wheels;
