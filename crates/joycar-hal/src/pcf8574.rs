//! [`InputExpander`] – PCF8574 8-bit quasi-bidirectional I/O expander.
//!
//! The PCF8574 has no register file: a one-byte read returns the level of
//! all eight pins and a one-byte write sets them.  Through
//! [`RegisterDevice`] the register argument is therefore ignored and every
//! register maps onto the single port.

use joycar_types::JoyError;

use crate::bus::BusLock;
use crate::device::RegisterDevice;

/// Default bus address of the JoyCar sensor expander.
pub const DEFAULT_ADDRESS: u8 = 0x38;

#[derive(Debug, Clone)]
pub struct InputExpander {
    bus: BusLock,
    address: u8,
}

impl InputExpander {
    pub fn new(bus: BusLock, address: u8) -> Self {
        Self { bus, address }
    }

    /// Read the eight pin levels.
    pub fn read_port(&self) -> Result<u8, JoyError> {
        let address = self.address;
        self.bus.with_lock(|bus| {
            bus.read(address, 1)?
                .first()
                .copied()
                .ok_or_else(|| JoyError::Transport {
                    address,
                    details: "empty read".to_string(),
                })
        })
    }

    /// Drive the eight pins.  A pin written high doubles as an input.
    pub fn write_port(&self, value: u8) -> Result<(), JoyError> {
        let address = self.address;
        self.bus.with_lock(|bus| bus.write(address, &[value]))
    }
}

impl RegisterDevice for InputExpander {
    fn address(&self) -> u8 {
        self.address
    }

    fn read_register(&self, _register: u8) -> Result<u8, JoyError> {
        self.read_port()
    }

    fn write_register(&self, _register: u8, value: u8) -> Result<(), JoyError> {
        self.write_port(value)
    }

    fn write_two_registers(
        &self,
        _first_register: u8,
        first_value: u8,
        _second_register: u8,
        second_value: u8,
    ) -> Result<(), JoyError> {
        let address = self.address;
        self.bus.with_lock(|bus| {
            bus.write(address, &[first_value])?;
            bus.write(address, &[second_value])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBus, SimClock};

    fn expander(sim: &SimBus) -> InputExpander {
        let bus = BusLock::new(Box::new(sim.clone()), SimClock::new().shared(), 5);
        InputExpander::new(bus, DEFAULT_ADDRESS)
    }

    #[test]
    fn read_port_returns_one_byte() {
        let sim = SimBus::new();
        sim.queue_read(vec![0b0001_1100]);
        let pcf = expander(&sim);
        assert_eq!(pcf.read_port().unwrap(), 0b0001_1100);
        assert_eq!(sim.reads(), vec![(0x38, 1)]);
        assert!(!sim.is_locked());
    }

    #[test]
    fn register_read_ignores_register_number() {
        let sim = SimBus::new();
        sim.queue_read(vec![0x5A]);
        let pcf = expander(&sim);
        assert_eq!(pcf.read_register(0x07).unwrap(), 0x5A);
    }

    #[test]
    fn write_port_sends_one_byte() {
        let sim = SimBus::new();
        let pcf = expander(&sim);
        pcf.write_port(0xFF).unwrap();
        assert_eq!(sim.writes(), vec![(0x38, vec![0xFF])]);
    }

    #[test]
    fn two_port_writes_share_one_acquisition() {
        let sim = SimBus::new();
        let pcf = expander(&sim);
        pcf.write_two_registers(0, 0x0F, 0, 0xF0).unwrap();
        assert_eq!(sim.writes(), vec![(0x38, vec![0x0F]), (0x38, vec![0xF0])]);
        assert_eq!(sim.acquisitions(), 1);
    }

    #[test]
    fn read_failure_propagates() {
        let sim = SimBus::new();
        sim.fail_address(0x38);
        let pcf = expander(&sim);
        assert!(matches!(
            pcf.read_port(),
            Err(JoyError::Transport { address: 0x38, .. })
        ));
        assert!(!sim.is_locked());
    }
}
