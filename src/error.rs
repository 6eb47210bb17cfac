//! Unified error type for the I/O core.
//!
//! The sampling and scan paths never return errors to the scheduler loop;
//! transient faults there are logged and counted.  This type is what the
//! explicit request paths (construction, commands, config updates) return.
//! All variants are `Copy` so they can be passed around without allocation.

use core::fmt;

use crate::app::ports::{ConfigError, GpioError};
use crate::points::PointError;

/// Every fallible request into the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Point lookup or output command rejected.
    Point(PointError),
    /// A pin could not be read or driven.
    Gpio(GpioError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point(e) => write!(f, "point: {e}"),
            Self::Gpio(e) => write!(f, "gpio: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<PointError> for Error {
    fn from(e: PointError) -> Self {
        Self::Point(e)
    }
}

impl From<GpioError> for Error {
    fn from(e: GpioError) -> Self {
        Self::Gpio(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
