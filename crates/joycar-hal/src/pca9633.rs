//! [`PwmDriver`] – PCA9633 four-channel PWM driver used for the motors.
//!
//! Each wheel's H-bridge is fed by two channels, one per direction.  The
//! mode registers are configured once at start-up with
//! [`PwmDriver::configure_outputs`]; afterwards only the `PWMx` duty
//! registers change.

use joycar_types::JoyError;
use tracing::info;

use crate::bus::BusLock;
use crate::device::RegisterDevice;

/// Default bus address of the JoyCar motor driver.
pub const DEFAULT_ADDRESS: u8 = 0x62;

/// `MODE1` value: normal mode, oscillator on, no auto-increment.
pub const MODE1_NORMAL: u8 = 0x00;
/// `LEDOUT` value: all four outputs driven by their own `PWMx` register.
pub const LEDOUT_ALL_PWM: u8 = 0xAA;

/// PCA9633 register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PwmRegister {
    Mode1 = 0x00,
    Mode2 = 0x01,
    Pwm0 = 0x02,
    Pwm1 = 0x03,
    Pwm2 = 0x04,
    Pwm3 = 0x05,
    GrpPwm = 0x06,
    GrpFreq = 0x07,
    LedOut = 0x08,
}

impl From<PwmRegister> for u8 {
    fn from(register: PwmRegister) -> Self {
        register as u8
    }
}

#[derive(Debug, Clone)]
pub struct PwmDriver {
    bus: BusLock,
    address: u8,
}

impl PwmDriver {
    pub fn new(bus: BusLock, address: u8) -> Self {
        Self { bus, address }
    }

    /// Put the driver in normal mode with every output under individual PWM
    /// control.  Both mode registers are written under one acquisition.
    pub fn configure_outputs(&self) -> Result<(), JoyError> {
        self.write_two_registers(
            PwmRegister::Mode1.into(),
            MODE1_NORMAL,
            PwmRegister::LedOut.into(),
            LEDOUT_ALL_PWM,
        )?;
        info!(address = self.address, "PCA9633 outputs configured");
        Ok(())
    }
}

impl RegisterDevice for PwmDriver {
    fn address(&self) -> u8 {
        self.address
    }

    fn read_register(&self, register: u8) -> Result<u8, JoyError> {
        let address = self.address;
        let mut value = [0u8; 1];
        self.bus
            .with_lock(|bus| bus.write_then_read(address, &[register], &mut value))?;
        Ok(value[0])
    }

    fn write_register(&self, register: u8, value: u8) -> Result<(), JoyError> {
        let address = self.address;
        self.bus.with_lock(|bus| bus.write(address, &[register, value]))
    }

    fn write_two_registers(
        &self,
        first_register: u8,
        first_value: u8,
        second_register: u8,
        second_value: u8,
    ) -> Result<(), JoyError> {
        let address = self.address;
        self.bus.with_lock(|bus| {
            bus.write(address, &[first_register, first_value])?;
            bus.write(address, &[second_register, second_value])
        })
    }
}
