//! I/O service, the scheduler-facing core.
//!
//! [`IoService`] owns the point table, the sample filter and the bus
//! scanner.  The firmware loop calls [`IoService::tick`] as often as it
//! likes; each call does a bounded amount of hardware work and returns.
//!
//! ```text
//!   GpioPort ──▶ ┌──────────────────────────┐
//!                │        IoService          │ ──▶ Emitter
//!    BusPort ◀──▶│ PointTable · Filter · Bus │
//!                └──────────────────────────┘
//!                        ▲
//!                  IoCommand (outputs, resync, config)
//! ```

use log::{debug, info, warn};

use crate::bus::{BusScanner, ScanState, ScanStats};
use crate::config::SamplingConfig;
use crate::error::Result;
use crate::filter::SampleFilter;
use crate::points::{Point, PointError, PointId, PointKind, PointTable, Reading};

use super::commands::IoCommand;
use super::ports::{BusPort, Emitter, GpioPort};

// ───────────────────────────────────────────────────────────────
// IoService
// ───────────────────────────────────────────────────────────────

pub struct IoService {
    points: PointTable,
    filter: SampleFilter,
    scanner: BusScanner,
    config: SamplingConfig,
    /// Set by [`channel_connected`](Self::channel_connected); consumed by
    /// the next tick.
    resync_pending: bool,
    tick_count: u64,
}

impl IoService {
    /// Build the service.  Fails if `config` is out of range.
    pub fn new(config: SamplingConfig, points: PointTable) -> Result<Self> {
        config.validate()?;
        info!(
            "IoService: {} point(s), scan every {} ms, timeout {} ms",
            points.len(),
            config.scan_interval_ms,
            config.conversion_timeout_ms
        );
        Ok(Self {
            filter: SampleFilter::new(&config),
            scanner: BusScanner::new(&config),
            points,
            config,
            resync_pending: false,
            tick_count: 0,
        })
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one scheduler iteration: sample GPIO inputs → filter → one bus
    /// scanner step.
    ///
    /// The `io` parameter satisfies **both** [`GpioPort`] and [`BusPort`];
    /// on most boards one adapter owns all the pins.
    pub fn tick(
        &mut self,
        now_ms: u32,
        io: &mut (impl GpioPort + BusPort),
        emitter: &mut impl Emitter,
    ) {
        self.tick_count += 1;

        // 1. Sample directly-wired inputs
        for point in self.points.iter_mut().filter(|p| p.kind().is_gpio_input()) {
            sample(point, io);
        }

        // 2. Publish decision (or unconditional resync)
        if self.resync_pending {
            self.resync_pending = false;
            self.publish_all(emitter);
        } else {
            for point in self.points.iter_mut().filter(|p| p.kind().is_gpio_input()) {
                self.filter.evaluate(point, emitter);
            }
        }

        // 3. Bus scanner
        self.scanner
            .step(now_ms, io, &mut self.points, &self.filter, emitter);
    }

    /// The output channel (MQTT broker, Modbus master) just (re)connected.
    /// The next tick samples inputs and republishes everything.
    pub fn channel_connected(&mut self) {
        debug!("IoService: channel connected, resync latched");
        self.resync_pending = true;
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.
    pub fn handle_command(
        &mut self,
        cmd: IoCommand,
        gpio: &mut impl GpioPort,
        emitter: &mut impl Emitter,
    ) -> Result<()> {
        match cmd {
            IoCommand::SetOutput { point, value } => self.set_output(point, value, gpio, emitter),
            IoCommand::Resync => {
                self.resync_pending = false;
                self.publish_all(emitter);
                Ok(())
            }
            IoCommand::UpdateConfig(config) => {
                config.validate()?;
                self.filter.configure(&config);
                self.scanner.configure(&config);
                self.config = config;
                info!("IoService: configuration updated at runtime");
                Ok(())
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn points(&self) -> &PointTable {
        &self.points
    }

    pub fn point(&self, id: PointId) -> Option<&Point> {
        self.points.get(id)
    }

    pub fn scan_state(&self) -> ScanState {
        self.scanner.state()
    }

    pub fn scan_stats(&self) -> ScanStats {
        self.scanner.stats()
    }

    /// Bus devices found in the current scan cycle.
    pub fn bus_devices(&self) -> &[crate::bus::BusDevice] {
        self.scanner.devices()
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Total ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn publish_all(&mut self, emitter: &mut impl Emitter) {
        let mut n = 0usize;
        for point in self.points.iter_mut() {
            if self.filter.force(point, emitter) {
                n += 1;
            }
        }
        info!("IoService: resync published {} point(s)", n);
    }

    fn set_output(
        &mut self,
        id: PointId,
        value: u16,
        gpio: &mut impl GpioPort,
        emitter: &mut impl Emitter,
    ) -> Result<()> {
        let point = self.points.get_mut(id).ok_or(PointError::Unknown(id))?;
        let reading = match point.kind() {
            PointKind::DigitalOutput => {
                let high = value != 0;
                gpio.write_digital(point.pin(), high)?;
                Reading::Int(u16::from(high))
            }
            PointKind::PwmOutput => {
                let duty = u8::try_from(value).map_err(|_| PointError::ValueOutOfRange(id))?;
                gpio.write_pwm(point.pin(), duty)?;
                Reading::Int(u16::from(duty))
            }
            _ => return Err(PointError::NotAnOutput(id).into()),
        };

        if reading != point.raw_value {
            point.raw_value = reading;
            self.filter.force(point, emitter);
        }
        Ok(())
    }
}

/// Read one GPIO input into `raw_value`.  A failed read keeps the previous
/// value so a flaky pin cannot fake an edge.
fn sample(point: &mut Point, gpio: &mut impl GpioPort) {
    let result = match point.kind() {
        PointKind::DigitalInput => gpio
            .read_digital(point.pin())
            .map(|b| Reading::Int(u16::from(b))),
        PointKind::AnalogInput => gpio.read_analog(point.pin()).map(Reading::Int),
        _ => return,
    };
    match result {
        Ok(v) => point.raw_value = v,
        Err(e) => warn!("IoService: {} ({}) sample failed: {}", point.id(), point.label(), e),
    }
}
