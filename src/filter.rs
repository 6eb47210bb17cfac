//! Publish decision for freshly sampled points.
//!
//! The filter runs every time a point's `raw_value` is refreshed and
//! decides whether the new value is worth emitting:
//!
//! | Kind          | Policy                                                     |
//! |---------------|------------------------------------------------------------|
//! | `din`         | debounce: the new level must differ for more than          |
//! |               | `debounce_depth` consecutive samples                       |
//! | `ain`         | delta: `abs(raw - last_published) >= analog_threshold`     |
//! | `ow`          | delta: `abs(raw - last_published) >= bus_delta_threshold`  |
//! | `dout/pwmout` | never (outputs publish when commanded)                     |
//!
//! Invalid points are never published through this path; invalidation is
//! signalled out of band by the subsystem that owns the point.

use crate::app::ports::Emitter;
use crate::config::SamplingConfig;
use crate::points::{Point, PointKind};

/// Debounce / hysteresis filter shared by every point.
#[derive(Debug, Clone)]
pub struct SampleFilter {
    debounce_depth: u8,
    analog_threshold: u16,
    bus_delta_threshold: f32,
}

impl SampleFilter {
    pub fn new(config: &SamplingConfig) -> Self {
        Self {
            debounce_depth: config.debounce_depth,
            analog_threshold: config.analog_threshold,
            bus_delta_threshold: config.bus_delta_threshold,
        }
    }

    /// Pick up new thresholds.  Pending debounce counters are kept.
    pub fn configure(&mut self, config: &SamplingConfig) {
        *self = Self::new(config);
    }

    /// Evaluate `point` and publish through `emitter` if the change is
    /// significant.  Returns `true` when a publish happened.
    pub fn evaluate(&self, point: &mut Point, emitter: &mut impl Emitter) -> bool {
        if !self.is_significant(point) {
            return false;
        }
        emitter.publish(point.id(), point.raw_value);
        point.mark_published();
        true
    }

    /// Publish the current value unconditionally (resync after the output
    /// channel reconnects).  Points without a valid reading are skipped.
    pub fn force(&self, point: &mut Point, emitter: &mut impl Emitter) -> bool {
        if !point.valid {
            return false;
        }
        emitter.publish(point.id(), point.raw_value);
        point.mark_published();
        true
    }

    fn is_significant(&self, point: &mut Point) -> bool {
        if !point.valid {
            point.pending_count = 0;
            return false;
        }
        match point.kind() {
            PointKind::DigitalInput => self.debounce(point),
            PointKind::AnalogInput => {
                point.raw_value.delta(point.last_published_value) >= self.analog_threshold as f32
            }
            PointKind::BusSensor => {
                point.raw_value.delta(point.last_published_value) >= self.bus_delta_threshold
            }
            PointKind::DigitalOutput | PointKind::PwmOutput => false,
        }
    }

    fn debounce(&self, point: &mut Point) -> bool {
        if point.raw_value == point.last_published_value {
            point.pending_count = 0;
            return false;
        }
        if point.pending_count < self.debounce_depth {
            point.pending_count += 1;
            return false;
        }
        true
    }
}
