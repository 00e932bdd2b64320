//! `joycar-hal` – hardware abstraction for the JoyCar robot.
//!
//! # Modules
//!
//! - [`clock`] – wrapping millisecond [`Tick`][clock::Tick]s and the
//!   [`Clock`][clock::Clock] boundary.
//! - [`timer`] – one-shot [`Timer`][timer::Timer] and self-rearming
//!   [`PeriodicTimer`][timer::PeriodicTimer].
//! - [`transport`] – the [`Transport`][transport::Transport] bus boundary.
//! - [`bus`] – [`BusLock`][bus::BusLock]: scoped, time-bounded bus access
//!   through which every device transfer is issued.
//! - [`device`] – the [`RegisterDevice`][device::RegisterDevice] trait.
//! - [`pcf8574`] – [`InputExpander`][pcf8574::InputExpander] for the sensors.
//! - [`pca9633`] – [`PwmDriver`][pca9633::PwmDriver] for the motors.
//! - [`display`] – outgoing-only [`Display`][display::Display] boundary.
//! - [`i2c`] – [`I2cTransport`][i2c::I2cTransport] over `embedded-hal`.
//! - [`sim`] – simulated clock, bus and display for headless runs.

pub mod bus;
pub mod clock;
pub mod device;
pub mod display;
pub mod i2c;
pub mod pca9633;
pub mod pcf8574;
pub mod sim;
pub mod timer;
pub mod transport;

pub use bus::{BusGuard, BusLock};
pub use clock::{Clock, SharedClock, SystemClock, Tick};
pub use device::RegisterDevice;
pub use display::{Display, NullDisplay, SensorPattern};
pub use pca9633::{PwmDriver, PwmRegister};
pub use pcf8574::InputExpander;
pub use timer::{PeriodicTimer, Timer};
pub use transport::Transport;
