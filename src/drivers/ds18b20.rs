//! DS18B20 temperature sensors on one or more 1-Wire lines.
//!
//! Implements [`BusPort`] so the bus scanner can drive any number of
//! sensors without knowing the wire protocol:
//!
//! | Port call                 | Wire transaction                          |
//! |---------------------------|-------------------------------------------|
//! | `reset_and_enumerate`     | Search ROM                                |
//! | `begin_conversion`        | Match ROM + Convert T                     |
//! | `is_conversion_complete`  | one read slot (device holds 0 while busy) |
//! | `read_value`              | Match ROM + Read Scratchpad, CRC checked  |
//!
//! Parasite power is not supported: the read-slot completion poll needs
//! an externally powered sensor.

use log::debug;

use crate::app::ports::BusPort;
use crate::bus::DISCONNECTED_C;
use crate::bus::address::DeviceAddress;

use super::onewire::{BitIo, read_checked, search};

/// Family code of the DS18B20 ROM.
pub const FAMILY_CODE: u8 = 0x28;

/// Lines one adapter can serve.
pub const MAX_LINES: usize = 4;

/// Function commands.
mod cmd {
    pub const CONVERT_T: u8 = 0x44;
    pub const READ_SCRATCHPAD: u8 = 0xBE;
}

/// Scratchpad layout: temp LSB, temp MSB, TH, TL, config, 3 reserved, CRC.
pub const SCRATCHPAD_LEN: usize = 9;

/// Convert a CRC-checked scratchpad to °C (1/16 °C per LSB).
pub fn scratchpad_to_celsius(scratchpad: &[u8; SCRATCHPAD_LEN]) -> f32 {
    f32::from(i16::from_le_bytes([scratchpad[0], scratchpad[1]])) / 16.0
}

/// DS18B20 sensors on up to [`MAX_LINES`] 1-Wire lines.
pub struct Ds18b20Bus<B> {
    lines: heapless::Vec<(u8, B), MAX_LINES>,
}

impl<B> Default for Ds18b20Bus<B> {
    fn default() -> Self {
        Self { lines: heapless::Vec::new() }
    }
}

impl<B: BitIo> Ds18b20Bus<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a 1-Wire master as bus line `line`.  Returns the master back
    /// if all line slots are taken.
    pub fn with_line(mut self, line: u8, wire: B) -> Result<Self, B> {
        self.lines.push((line, wire)).map_err(|(_, w)| w)?;
        Ok(self)
    }

    fn wire(&mut self, line: u8) -> Option<&mut B> {
        self.lines
            .iter_mut()
            .find(|(l, _)| *l == line)
            .map(|(_, w)| w)
    }
}

impl<B: BitIo> BusPort for Ds18b20Bus<B> {
    fn reset_and_enumerate(&mut self, line: u8, found: &mut dyn FnMut(DeviceAddress)) {
        let Some(wire) = self.wire(line) else {
            debug!("DS18B20: no master on line {}", line);
            return;
        };
        if let Err(e) = search(wire, found) {
            debug!("DS18B20: search on line {} failed: {}", line, e);
        }
    }

    fn begin_conversion(&mut self, line: u8, address: &DeviceAddress) -> bool {
        let Some(wire) = self.wire(line) else {
            return false;
        };
        match wire.select(address).and_then(|()| wire.write_byte(cmd::CONVERT_T)) {
            Ok(()) => true,
            Err(e) => {
                debug!("DS18B20: {} convert failed: {}", address, e);
                false
            }
        }
    }

    fn is_conversion_complete(&mut self, line: u8, _address: &DeviceAddress) -> bool {
        // A missing line or pin error reads as "done"; read_value then
        // reports the failure.
        self.wire(line).is_none_or(|w| w.read_bit().unwrap_or(true))
    }

    fn read_value(&mut self, line: u8, address: &DeviceAddress) -> f32 {
        let Some(wire) = self.wire(line) else {
            return DISCONNECTED_C;
        };
        let frame = wire
            .select(address)
            .and_then(|()| wire.write_byte(cmd::READ_SCRATCHPAD))
            .and_then(|()| read_checked::<SCRATCHPAD_LEN>(wire));
        match frame {
            Ok(Some(scratchpad)) => scratchpad_to_celsius(&scratchpad),
            Ok(None) => {
                debug!("DS18B20: {} scratchpad CRC mismatch", address);
                DISCONNECTED_C
            }
            Err(e) => {
                debug!("DS18B20: {} read failed: {}", address, e);
                DISCONNECTED_C
            }
        }
    }
}
