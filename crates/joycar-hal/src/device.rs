//! Generic [`RegisterDevice`] trait shared by the bus peripherals.

use joycar_types::JoyError;

/// A bus peripheral addressed through byte-wide registers.
///
/// Implementations issue every transfer through
/// [`BusLock::with_lock`][crate::bus::BusLock::with_lock] and never retry;
/// a failure is returned to the caller with nothing else written.
pub trait RegisterDevice: Send + Sync {
    /// 7-bit bus address of the device.
    fn address(&self) -> u8;

    fn read_register(&self, register: u8) -> Result<u8, JoyError>;

    fn write_register(&self, register: u8, value: u8) -> Result<(), JoyError>;

    /// Write two registers back to back under a single bus acquisition, so
    /// no other bus user can observe the pair half-applied.
    ///
    /// # Errors
    ///
    /// Returns the first failure.  When the first write fails the second is
    /// not attempted.
    fn write_two_registers(
        &self,
        first_register: u8,
        first_value: u8,
        second_register: u8,
        second_value: u8,
    ) -> Result<(), JoyError>;
}
