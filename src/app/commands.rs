//! Inbound commands to the I/O service.
//!
//! Requests from the outside world (MQTT subscriptions, Modbus register
//! writes, a serial console) that [`IoService`](super::service::IoService)
//! interprets and acts upon.

use crate::config::SamplingConfig;
use crate::points::PointId;

/// Commands that external adapters can send into the core.
#[derive(Debug, Clone)]
pub enum IoCommand {
    /// Drive an output.  Digital outputs treat any non-zero value as high;
    /// PWM outputs take a duty in `0..=255`.
    SetOutput { point: PointId, value: u16 },

    /// Publish every valid point now, regardless of the filter.
    Resync,

    /// Hot-reload sampling configuration.
    UpdateConfig(SamplingConfig),
}
