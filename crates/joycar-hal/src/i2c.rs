//! [`I2cTransport`] – hardware [`Transport`] over any `embedded-hal` I2C bus.
//!
//! Callers going through a [`BusLock`][crate::bus::BusLock] are already
//! serialised by its handle, so the claim kept here is bookkeeping for
//! direct use of the transport: `try_acquire` fails while this handle is
//! claimed and not yet released.

use embedded_hal::i2c::{Error, I2c};
use joycar_types::JoyError;

use crate::transport::Transport;

/// First and last address tried by [`Transport::scan`]; the rest of the
/// 7-bit space is reserved.
const SCAN_RANGE: std::ops::RangeInclusive<u8> = 0x08..=0x77;

pub struct I2cTransport<I> {
    i2c: I,
    claimed: bool,
}

impl<I: I2c> I2cTransport<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            claimed: false,
        }
    }

    /// Give back the underlying bus.
    pub fn into_inner(self) -> I {
        self.i2c
    }
}

fn transport_error<E: Error>(address: u8, err: E) -> JoyError {
    JoyError::Transport {
        address,
        details: format!("{:?}", err.kind()),
    }
}

impl<I: I2c + Send> Transport for I2cTransport<I> {
    fn try_acquire(&mut self) -> bool {
        if self.claimed {
            return false;
        }
        self.claimed = true;
        true
    }

    fn release(&mut self) {
        self.claimed = false;
    }

    fn read(&mut self, address: u8, len: usize) -> Result<Vec<u8>, JoyError> {
        let mut buffer = vec![0u8; len];
        self.i2c
            .read(address, &mut buffer)
            .map_err(|e| transport_error(address, e))?;
        Ok(buffer)
    }

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), JoyError> {
        self.i2c
            .write(address, bytes)
            .map_err(|e| transport_error(address, e))
    }

    fn write_then_read(
        &mut self,
        address: u8,
        out: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), JoyError> {
        self.i2c
            .write_read(address, out, buffer)
            .map_err(|e| transport_error(address, e))
    }

    fn scan(&mut self) -> Result<Vec<u8>, JoyError> {
        let mut byte = [0u8; 1];
        Ok(SCAN_RANGE
            .filter(|&address| self.i2c.read(address, &mut byte).is_ok())
            .collect())
    }
}
