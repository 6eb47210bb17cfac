//! Log-based emitter adapter.
//!
//! Implements [`Emitter`] by writing every publish to the ESP-IDF logger
//! (UART / USB-CDC in production).  An MQTT or Modbus adapter implements
//! the same trait and maps [`PointId`]s to topics or registers.

use log::{info, warn};

use crate::app::ports::Emitter;
use crate::bus::ScanStats;
use crate::points::{PointId, Reading};

/// Adapter that logs every published value to the serial console.
#[derive(Debug, Default)]
pub struct LogEmitter {
    published: u32,
}

impl LogEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values published since start-up.
    pub fn published(&self) -> u32 {
        self.published
    }

    /// Dump scanner counters as one JSON line.
    pub fn log_stats(&self, stats: &ScanStats) {
        match serde_json::to_string(stats) {
            Ok(json) => info!("STATS | {}", json),
            Err(e) => warn!("STATS | encode failed: {}", e),
        }
    }
}

impl Emitter for LogEmitter {
    fn publish(&mut self, point: PointId, value: Reading) {
        self.published = self.published.wrapping_add(1);
        info!("PUB   | {} = {}", point, value);
    }

    fn invalidate(&mut self, point: PointId) {
        info!("INVAL | {}", point);
    }
}
