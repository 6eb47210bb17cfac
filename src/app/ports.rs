//! Port traits: the boundary between the sampling core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ IoService (core)
//! ```
//!
//! Driven adapters (GPIO, bus, emitter, config storage) implement these
//! traits.  The [`IoService`](super::service::IoService) consumes them via
//! generics, so the core never touches hardware directly.
//!
//! Every call on [`GpioPort`] and [`BusPort`] must complete within one
//! short hardware transaction.  Anything slower is the caller's state
//! machine's job to split across ticks.

use core::fmt;

use crate::bus::address::DeviceAddress;
use crate::config::SamplingConfig;
use crate::points::{PointId, Reading};

// ───────────────────────────────────────────────────────────────
// Bus port (driven adapter: multi-drop sensor bus → core)
// ───────────────────────────────────────────────────────────────

/// Access to one or more multi-drop sensor bus lines.
///
/// `read_value` returns [`DISCONNECTED_C`](crate::bus::DISCONNECTED_C) when
/// the device did not answer or its data failed integrity checks.
pub trait BusPort {
    /// Reset `line` and walk its enumeration, handing every address found
    /// to `found` (including ones with a bad checksum; the scanner
    /// filters those).
    fn reset_and_enumerate(&mut self, line: u8, found: &mut dyn FnMut(DeviceAddress));

    /// Ask `address` to start a measurement.  `false` if nobody answered.
    fn begin_conversion(&mut self, line: u8, address: &DeviceAddress) -> bool;

    /// Poll whether the measurement started on `line` has finished.
    fn is_conversion_complete(&mut self, line: u8, address: &DeviceAddress) -> bool;

    /// Fetch the converted value.
    fn read_value(&mut self, line: u8, address: &DeviceAddress) -> f32;
}

// ───────────────────────────────────────────────────────────────
// GPIO port (driven adapter: pins ↔ core)
// ───────────────────────────────────────────────────────────────

/// Plain pin I/O addressed by board pin number.
pub trait GpioPort {
    fn read_digital(&mut self, pin: u8) -> Result<bool, GpioError>;

    /// Raw ADC counts.
    fn read_analog(&mut self, pin: u8) -> Result<u16, GpioError>;

    fn write_digital(&mut self, pin: u8, high: bool) -> Result<(), GpioError>;

    /// PWM duty in `0..=255`.
    fn write_pwm(&mut self, pin: u8, duty: u8) -> Result<(), GpioError>;
}

// ───────────────────────────────────────────────────────────────
// Emitter (driven adapter: core → MQTT / Modbus / display)
// ───────────────────────────────────────────────────────────────

/// Sink for significant point values.  Transport-agnostic: topic or
/// register naming is the implementation's business.
pub trait Emitter {
    fn publish(&mut self, point: PointId, value: Reading);

    /// A point lost its source (e.g. bus sensor unplugged).  Reported out of
    /// band; the numeric path never publishes a "now invalid" value.
    fn invalidate(&mut self, _point: PointId) {}
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: core ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`SamplingConfig`].
///
/// Implementations MUST validate before persisting and reject bad values
/// with [`ConfigError::ValidationFailed`] rather than clamping them.
pub trait ConfigPort {
    /// Returns [`SamplingConfig::default()`] if nothing is stored yet.
    fn load(&self) -> Result<SamplingConfig, ConfigError>;

    fn save(&mut self, config: &SamplingConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`GpioPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    /// No pin with that number is wired to the adapter.
    UnknownPin(u8),
    ReadFailed(u8),
    WriteFailed(u8),
    /// The pin exists but cannot do what was asked (e.g. analog read on a
    /// digital-only pin).
    Unsupported(u8),
    /// The adapter has no free slot left for another pin.
    TableFull(u8),
}

/// Errors from [`ConfigPort`] operations and config validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A field failed range validation; the message names it.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPin(p) => write!(f, "unknown pin {p}"),
            Self::ReadFailed(p) => write!(f, "read failed on pin {p}"),
            Self::WriteFailed(p) => write!(f, "write failed on pin {p}"),
            Self::Unsupported(p) => write!(f, "operation unsupported on pin {p}"),
            Self::TableFull(p) => write!(f, "no slot left for pin {p}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
