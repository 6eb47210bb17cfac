//! 64-bit 1-Wire ROM address and the Dallas/Maxim CRC-8 that guards it.
//!
//! ```text
//!  byte  0        1 .. 6          7
//!       ┌──────┬────────────────┬─────┐
//!       │family│  serial (LSB)  │ CRC │
//!       └──────┴────────────────┴─────┘
//! ```

use core::fmt;

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 8;

// CRC-8/MAXIM-DOW: poly 0x31 reflected (0x8C), init 0x00, no xorout.
const CRC8_TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 0x01 != 0 { (crc >> 1) ^ 0x8C } else { crc >> 1 };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Dallas/Maxim CRC-8 over `data`.  Running it over data plus its own CRC
/// byte yields zero.
pub fn crc8(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |crc, &b| CRC8_TABLE[(crc ^ b) as usize])
}

/// A device's bus-assigned ROM address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceAddress(pub [u8; ADDRESS_LEN]);

impl DeviceAddress {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address from family + serial, computing the CRC byte.
    pub fn with_crc(family: u8, serial: [u8; 6]) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[0] = family;
        bytes[1..7].copy_from_slice(&serial);
        bytes[7] = crc8(&bytes[..7]);
        Self(bytes)
    }

    pub fn family(&self) -> u8 {
        self.0[0]
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// CRC byte matches the first seven bytes.  The all-zero pattern a
    /// shorted line produces passes the CRC and is rejected explicitly.
    pub fn is_valid(&self) -> bool {
        self.0 != [0u8; ADDRESS_LEN] && crc8(&self.0[..7]) == self.0[7]
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
