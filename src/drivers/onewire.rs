//! Bit-banged 1-Wire master.
//!
//! ## Hardware
//!
//! One open-drain GPIO with an external 4.7 kΩ pull-up.  Driving the pin
//! low pulls the line down; driving it high releases it.  The pin must be
//! readable while released (`InputPin + OutputPin` on the same driver,
//! e.g. an ESP-IDF `PinDriver` in `InputOutputOd` mode).
//!
//! ## Timing (standard speed, µs)
//!
//! | Slot        | Low | Release → sample | Recovery |
//! |-------------|-----|------------------|----------|
//! | Reset       | 480 | 70               | 410      |
//! | Write 1     | 6   |                  | 64       |
//! | Write 0     | 60  |                  | 10       |
//! | Read        | 6   | 9                | 55       |
//!
//! A reset is the longest single transaction (~1 ms); everything else is
//! under 100 µs per bit.
//!
//! ROM search and byte framing are written against the [`BitIo`] trait so
//! they can be exercised without a wire.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::debug;

use crate::bus::address::{DeviceAddress, crc8};

/// ROM-level commands.
pub mod cmd {
    pub const SEARCH_ROM: u8 = 0xF0;
    pub const MATCH_ROM: u8 = 0x55;
    pub const SKIP_ROM: u8 = 0xCC;
}

/// Upper bound on devices one search pass walks before giving up.
pub const MAX_SEARCH_DEVICES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneWireError {
    /// The pin driver reported an error.
    Pin,
    /// Reset pulse saw no presence response.
    NoPresence,
    /// Both a bit and its complement read 1 during search: devices vanished
    /// mid-search.
    SearchFailed,
}

impl core::fmt::Display for OneWireError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Pin => write!(f, "pin error"),
            Self::NoPresence => write!(f, "no presence pulse"),
            Self::SearchFailed => write!(f, "search lost devices"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Bit-level access
// ═══════════════════════════════════════════════════════════════

/// Time slot primitives of a 1-Wire line.
pub trait BitIo {
    /// Issue a reset pulse.  `Ok(true)` if at least one device answered.
    fn reset(&mut self) -> Result<bool, OneWireError>;

    fn write_bit(&mut self, bit: bool) -> Result<(), OneWireError>;

    fn read_bit(&mut self) -> Result<bool, OneWireError>;

    /// LSB first.
    fn write_byte(&mut self, byte: u8) -> Result<(), OneWireError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    /// LSB first.
    fn read_byte(&mut self) -> Result<u8, OneWireError> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    /// Reset, then address one device with Match ROM.
    fn select(&mut self, address: &DeviceAddress) -> Result<(), OneWireError> {
        if !self.reset()? {
            return Err(OneWireError::NoPresence);
        }
        self.write_byte(cmd::MATCH_ROM)?;
        for b in address.as_bytes() {
            self.write_byte(*b)?;
        }
        Ok(())
    }
}

/// Walk the whole ROM tree on `bus`, reporting each address to `found`.
///
/// Addresses are reported as read; checksum filtering is the caller's
/// job.  Returns the number of addresses reported.
///
/// One pass per device (reset plus 64 triplets, about 14 ms), capped at
/// [`MAX_SEARCH_DEVICES`] passes.
pub fn search(
    bus: &mut impl BitIo,
    found: &mut dyn FnMut(DeviceAddress),
) -> Result<usize, OneWireError> {
    let mut rom: u64 = 0;
    // 1-based position of the last branch where 0 was taken; 0 = none left.
    let mut last_discrepancy: u8 = 0;
    let mut count = 0usize;

    loop {
        if !bus.reset()? {
            return if count == 0 { Ok(0) } else { Err(OneWireError::NoPresence) };
        }
        bus.write_byte(cmd::SEARCH_ROM)?;

        let mut last_zero: u8 = 0;
        for position in 1..=64u8 {
            let idx = position - 1;
            let id_bit = bus.read_bit()?;
            let cmp_bit = bus.read_bit()?;

            let dir = match (id_bit, cmp_bit) {
                (true, true) => return Err(OneWireError::SearchFailed),
                (a, b) if a != b => a,
                _ => {
                    // Discrepancy: both values present on the wire.
                    let dir = if position < last_discrepancy {
                        rom & (1 << idx) != 0
                    } else {
                        position == last_discrepancy
                    };
                    if !dir {
                        last_zero = position;
                    }
                    dir
                }
            };

            if dir {
                rom |= 1 << idx;
            } else {
                rom &= !(1 << idx);
            }
            bus.write_bit(dir)?;
        }

        found(DeviceAddress::new(rom.to_le_bytes()));
        count += 1;
        last_discrepancy = last_zero;

        if last_discrepancy == 0 || count >= MAX_SEARCH_DEVICES {
            return Ok(count);
        }
    }
}

/// Read `N` bytes after a function command and check the trailing CRC.
pub fn read_checked<const N: usize>(
    bus: &mut impl BitIo,
) -> Result<Option<[u8; N]>, OneWireError> {
    let mut buf = [0u8; N];
    for b in &mut buf {
        *b = bus.read_byte()?;
    }
    // An all-ones frame means nobody drove the line.
    if buf.iter().all(|b| *b == 0xFF) || crc8(&buf) != 0 {
        return Ok(None);
    }
    Ok(Some(buf))
}

// ═══════════════════════════════════════════════════════════════
//  GPIO implementation
// ═══════════════════════════════════════════════════════════════

/// 1-Wire master on one open-drain pin.
pub struct OneWire<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> OneWire<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// Takes ownership of the pin and releases the line.
    pub fn new(mut pin: P, delay: D) -> Result<Self, OneWireError> {
        pin.set_high().map_err(|_| OneWireError::Pin)?;
        Ok(Self { pin, delay })
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    fn low(&mut self) -> Result<(), OneWireError> {
        self.pin.set_low().map_err(|_| OneWireError::Pin)
    }

    fn high(&mut self) -> Result<(), OneWireError> {
        self.pin.set_high().map_err(|_| OneWireError::Pin)
    }
}

impl<P, D> BitIo for OneWire<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn reset(&mut self) -> Result<bool, OneWireError> {
        self.low()?;
        self.delay.delay_us(480);
        self.high()?;
        self.delay.delay_us(70);
        let presence = self.pin.is_low().map_err(|_| OneWireError::Pin)?;
        self.delay.delay_us(410);
        if !presence {
            debug!("1-Wire: no presence pulse");
        }
        Ok(presence)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), OneWireError> {
        self.low()?;
        if bit {
            self.delay.delay_us(6);
            self.high()?;
            self.delay.delay_us(64);
        } else {
            self.delay.delay_us(60);
            self.high()?;
            self.delay.delay_us(10);
        }
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, OneWireError> {
        self.low()?;
        self.delay.delay_us(6);
        self.high()?;
        self.delay.delay_us(9);
        let bit = self.pin.is_high().map_err(|_| OneWireError::Pin)?;
        self.delay.delay_us(55);
        Ok(bit)
    }
}
