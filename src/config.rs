//! Sampling and bus-scan configuration.
//!
//! All tunables of the I/O core.  Values are supplied by the external
//! persistence layer at start-up (or pushed at runtime through
//! [`IoCommand::UpdateConfig`](crate::app::commands::IoCommand)); the core
//! itself never touches storage.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::bus::MAX_BUS_DEVICES;

/// Debounce depth must stay below this.
pub const DEBOUNCE_DEPTH_LIMIT: u8 = 32;
/// Analog threshold must stay below this.
pub const ANALOG_THRESHOLD_LIMIT: u16 = 255;

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    // --- Bus ---
    /// Minimum time between the starts of two bus scan cycles (ms).
    pub scan_interval_ms: u32,
    /// Longest wait for one device's conversion before it is abandoned (ms).
    pub conversion_timeout_ms: u32,
    /// Devices kept per scan; extra discoveries are dropped.
    pub bus_device_capacity: u8,
    /// Minimum change of a bus reading before it is republished.
    /// `0.0` republishes every completed conversion.
    pub bus_delta_threshold: f32,

    // --- GPIO inputs ---
    /// Consecutive differing samples a digital input must exceed before
    /// the new level is published.
    pub debounce_depth: u8,
    /// Minimum ADC delta for an analog input to be republished.
    pub analog_threshold: u16,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 1000,
            conversion_timeout_ms: 950,
            bus_device_capacity: MAX_BUS_DEVICES as u8,
            bus_delta_threshold: 0.0,

            debounce_depth: 16,
            analog_threshold: 16,
        }
    }
}

impl SamplingConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conversion_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "conversion_timeout_ms must be > 0",
            ));
        }
        if self.bus_device_capacity == 0 || self.bus_device_capacity as usize > MAX_BUS_DEVICES {
            return Err(ConfigError::ValidationFailed(
                "bus_device_capacity out of range",
            ));
        }
        if !self.bus_delta_threshold.is_finite() || self.bus_delta_threshold < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "bus_delta_threshold must be finite and >= 0",
            ));
        }
        if self.debounce_depth >= DEBOUNCE_DEPTH_LIMIT {
            return Err(ConfigError::ValidationFailed("debounce_depth must be < 32"));
        }
        if self.analog_threshold == 0 || self.analog_threshold >= ANALOG_THRESHOLD_LIMIT {
            return Err(ConfigError::ValidationFailed(
                "analog_threshold must be in 1..=254",
            ));
        }
        Ok(())
    }

    /// Parse a JSON config payload (missing fields take defaults) and
    /// validate it.
    pub fn from_json(payload: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(payload).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}
