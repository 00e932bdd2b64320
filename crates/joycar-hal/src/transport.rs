//! The [`Transport`] boundary to the physical two-wire bus.
//!
//! Drivers never hold a `Transport` directly; they go through
//! [`BusLock`][crate::bus::BusLock], which owns the single handle and
//! brackets every access with `try_acquire` / `release`.  Real hardware
//! ([`I2cTransport`][crate::i2c::I2cTransport]) and the in-process
//! [`SimBus`][crate::sim::SimBus] are interchangeable behind this trait.

use joycar_types::JoyError;

/// A claimable byte-oriented bus.
pub trait Transport: Send {
    /// Claim the bus for the caller.  Returns `false` when another master
    /// currently holds it.
    fn try_acquire(&mut self) -> bool;

    /// Give the bus back.  Must be safe to call after a failed transfer.
    fn release(&mut self);

    /// Read `len` bytes from the device at `address`.
    fn read(&mut self, address: u8, len: usize) -> Result<Vec<u8>, JoyError>;

    /// Write `bytes` to the device at `address`.
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), JoyError>;

    /// Write `out`, then fill `buffer` from the same device without releasing
    /// the bus in between (register-pointer reads).
    fn write_then_read(&mut self, address: u8, out: &[u8], buffer: &mut [u8])
    -> Result<(), JoyError>;

    /// Addresses of responding devices.  Buses that cannot scan report none.
    fn scan(&mut self) -> Result<Vec<u8>, JoyError> {
        Ok(Vec::new())
    }
}
