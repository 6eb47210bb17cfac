//! Multi-device bus acquisition state machine.
//!
//! Discovers devices on every bus line owned by a `BusSensor` point, asks
//! each one in turn for a measurement and republishes results as they come
//! in.  Each call to [`BusScanner::step`] performs at most one bounded bus
//! transaction, so the scheduler loop keeps servicing everything else while
//! a conversion is in flight.
//!
//! ```text
//!            interval elapsed                 lines walked, list non-empty
//!   ┌──────┐ ───────────────▶ ┌──────────┐ ──────────────────────────────┐
//!   │ Idle │                  │ Scanning │  (one line per step)          │
//!   └──────┘ ◀─────────────── └──────────┘                               ▼
//!      ▲       no devices                               ┌─────────────────────┐
//!      │                                                │ ConversionRequested │◀─┐
//!      │   list exhausted                               └─────────────────────┘  │
//!      ├──────────────────────────── rejected ───────────────┤ accepted          │
//!      │                                                     ▼                   │
//!      │                                          ┌────────────────────┐ next    │
//!      └───────────────────────────────────────── │ AwaitingConversion │ ────────┘
//!                                                 └────────────────────┘
//!                                                   complete | timed out
//! ```
//!
//! The device list is rebuilt from scratch at the start of every cycle; a
//! device unplugged mid-cycle simply fails its request or times out and is
//! gone from the next cycle.
//!
//! A `Scanning` step walks one whole line through
//! [`BusPort::reset_and_enumerate`].  On 1-Wire that is a full ROM search,
//! roughly 14 ms per device on the line, so keep lines short when the loop
//! period matters.  A point that comes back from invalid publishes its
//! first reading unconditionally.

pub mod address;

use log::{debug, info, warn};
use serde::Serialize;

use crate::app::ports::{BusPort, Emitter};
use crate::config::SamplingConfig;
use crate::filter::SampleFilter;
use crate::points::{PointId, PointTable, Reading};
use address::DeviceAddress;

/// Compile-time ceiling on devices tracked per scan cycle.
pub const MAX_BUS_DEVICES: usize = 16;

/// Value a bus sensor reports when it did not answer (DS18B20 convention).
pub const DISCONNECTED_C: f32 = -127.0;

// ═══════════════════════════════════════════════════════════════
//  State
// ═══════════════════════════════════════════════════════════════

/// Phase of the current scan cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Waiting for the scan interval to elapse.
    Idle,
    /// Walking bus lines and rebuilding the device list.
    Scanning,
    /// Next step issues a start-conversion to the device at the cursor.
    ConversionRequested,
    /// Polling the device at the cursor for completion.
    AwaitingConversion,
}

/// A device discovered during the current cycle.
#[derive(Debug, Clone, Copy)]
pub struct BusDevice {
    pub address: DeviceAddress,
    /// Point this device's readings feed.
    pub owner: PointId,
    /// Bus line the device was found on.
    pub line: u8,
    /// Last good reading this cycle.
    pub value: Option<f32>,
}

/// Running counters.  Purely informational; none of them change behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Scan cycles that ran to completion.
    pub cycles: u32,
    pub devices_found: u32,
    /// Addresses dropped for a bad checksum.
    pub crc_rejects: u32,
    /// Valid addresses dropped because the device list was full.
    pub capacity_drops: u32,
    /// Conversion requests nobody answered.
    pub rejected_requests: u32,
    pub timeouts: u32,
    /// Completed conversions that returned the disconnected sentinel.
    pub invalid_reads: u32,
}

// ═══════════════════════════════════════════════════════════════
//  Scanner
// ═══════════════════════════════════════════════════════════════

/// Drives scan → convert → read cycles over all bus lines.
pub struct BusScanner {
    state: ScanState,
    devices: heapless::Vec<BusDevice, MAX_BUS_DEVICES>,
    /// Runtime device limit (`<= MAX_BUS_DEVICES`).
    capacity: usize,
    /// Device index for the convert/wait phases.
    cursor: usize,
    /// Point-table index the scan phase resumes from.
    scan_from: usize,
    /// `None` until the first cycle has run; forces an immediate scan.
    cycle_start_ms: Option<u32>,
    conversion_start_ms: u32,
    scan_interval_ms: u32,
    conversion_timeout_ms: u32,
    stats: ScanStats,
}

impl BusScanner {
    pub fn new(config: &SamplingConfig) -> Self {
        Self {
            state: ScanState::Idle,
            devices: heapless::Vec::new(),
            capacity: (config.bus_device_capacity as usize).min(MAX_BUS_DEVICES),
            cursor: 0,
            scan_from: 0,
            cycle_start_ms: None,
            conversion_start_ms: 0,
            scan_interval_ms: config.scan_interval_ms,
            conversion_timeout_ms: config.conversion_timeout_ms,
            stats: ScanStats::default(),
        }
    }

    /// Pick up new timing and capacity.  Takes effect from the next scan;
    /// a cycle in flight finishes with the devices it already has.
    pub fn configure(&mut self, config: &SamplingConfig) {
        self.capacity = (config.bus_device_capacity as usize).min(MAX_BUS_DEVICES);
        self.scan_interval_ms = config.scan_interval_ms;
        self.conversion_timeout_ms = config.conversion_timeout_ms;
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn devices(&self) -> &[BusDevice] {
        &self.devices
    }

    /// Index of the device being converted.  Meaningful only in the
    /// convert/wait states.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Advance the state machine by one transition.
    ///
    /// `now_ms` is a wrapping millisecond timestamp.  Readings that arrive
    /// are written into their owning point and run through `filter`.
    pub fn step(
        &mut self,
        now_ms: u32,
        bus: &mut impl BusPort,
        points: &mut PointTable,
        filter: &SampleFilter,
        emitter: &mut impl Emitter,
    ) -> ScanState {
        match self.state {
            ScanState::Idle => {
                let due = self
                    .cycle_start_ms
                    .is_none_or(|start| now_ms.wrapping_sub(start) >= self.scan_interval_ms);
                if due {
                    self.devices.clear();
                    self.scan_from = 0;
                    self.cursor = 0;
                    self.state = ScanState::Scanning;
                    debug!("Bus: scan cycle started");
                }
            }

            ScanState::Scanning => match points.next_bus_point(self.scan_from) {
                Some(owner) => {
                    self.scan_from = owner.index() + 1;
                    self.scan_line(owner, bus, points, emitter);
                }
                None => self.finish_scan(now_ms),
            },

            ScanState::ConversionRequested => self.request_conversion(now_ms, bus),

            ScanState::AwaitingConversion => {
                self.await_conversion(now_ms, bus, points, filter, emitter);
            }
        }
        self.state
    }

    // ── Internal ──────────────────────────────────────────────

    /// Enumerate the line owned by `owner` and append what is found.
    fn scan_line(
        &mut self,
        owner: PointId,
        bus: &mut impl BusPort,
        points: &mut PointTable,
        emitter: &mut impl Emitter,
    ) {
        let Some(point) = points.get_mut(owner) else {
            return;
        };
        let line = point.pin();
        let mut found_here = 0u32;

        let devices = &mut self.devices;
        let stats = &mut self.stats;
        let capacity = self.capacity;
        bus.reset_and_enumerate(line, &mut |address| {
            if !address.is_valid() {
                stats.crc_rejects = stats.crc_rejects.wrapping_add(1);
                debug!("Bus: line {} dropped corrupt address {}", line, address);
                return;
            }
            if devices.len() >= capacity
                || devices
                    .push(BusDevice { address, owner, line, value: None })
                    .is_err()
            {
                stats.capacity_drops = stats.capacity_drops.wrapping_add(1);
                return;
            }
            stats.devices_found = stats.devices_found.wrapping_add(1);
            found_here += 1;
        });

        if found_here == 0 {
            if point.valid {
                info!("Bus: {} lost its sensor (line {})", owner, line);
            }
            point.valid = false;
            point.pending_count = 0;
            emitter.invalidate(owner);
        } else {
            debug!("Bus: line {} has {} device(s)", line, found_here);
        }
    }

    fn finish_scan(&mut self, now_ms: u32) {
        if self.stats.capacity_drops > 0 && self.devices.len() == self.capacity {
            warn!(
                "Bus: device list full ({}), {} discoveries dropped so far",
                self.capacity, self.stats.capacity_drops
            );
        }
        if self.devices.is_empty() {
            self.end_cycle(now_ms);
        } else {
            self.cursor = 0;
            self.state = ScanState::ConversionRequested;
        }
    }

    fn request_conversion(&mut self, now_ms: u32, bus: &mut impl BusPort) {
        debug_assert!(self.cursor < self.devices.len());
        let Some(dev) = self.devices.get(self.cursor) else {
            self.end_cycle(now_ms);
            return;
        };
        if bus.begin_conversion(dev.line, &dev.address) {
            self.conversion_start_ms = now_ms;
            self.state = ScanState::AwaitingConversion;
        } else {
            self.stats.rejected_requests = self.stats.rejected_requests.wrapping_add(1);
            debug!("Bus: {} rejected conversion request", dev.address);
            self.advance(now_ms);
        }
    }

    fn await_conversion(
        &mut self,
        now_ms: u32,
        bus: &mut impl BusPort,
        points: &mut PointTable,
        filter: &SampleFilter,
        emitter: &mut impl Emitter,
    ) {
        debug_assert!(self.cursor < self.devices.len());
        let Some(dev) = self.devices.get_mut(self.cursor) else {
            self.end_cycle(now_ms);
            return;
        };

        if bus.is_conversion_complete(dev.line, &dev.address) {
            let value = bus.read_value(dev.line, &dev.address);
            if value == DISCONNECTED_C || !value.is_finite() {
                self.stats.invalid_reads = self.stats.invalid_reads.wrapping_add(1);
                debug!("Bus: {} returned no data", dev.address);
            } else {
                dev.value = Some(value);
                if let Some(point) = points.get_mut(dev.owner) {
                    point.raw_value = Reading::Float(value);
                    if point.valid {
                        filter.evaluate(point, emitter);
                    } else {
                        // Subscribers saw an invalidate; re-announce even
                        // if the value is within the delta threshold.
                        point.valid = true;
                        filter.force(point, emitter);
                    }
                }
            }
        } else if now_ms.wrapping_sub(self.conversion_start_ms) > self.conversion_timeout_ms {
            self.stats.timeouts = self.stats.timeouts.wrapping_add(1);
            warn!(
                "Bus: {} conversion timed out after {} ms",
                dev.address, self.conversion_timeout_ms
            );
        } else {
            return;
        }
        self.advance(now_ms);
    }

    /// Move the cursor on, or close the cycle when the list is exhausted.
    fn advance(&mut self, now_ms: u32) {
        self.cursor += 1;
        if self.cursor >= self.devices.len() {
            self.end_cycle(now_ms);
        } else {
            self.state = ScanState::ConversionRequested;
        }
    }

    fn end_cycle(&mut self, now_ms: u32) {
        self.stats.cycles = self.stats.cycles.wrapping_add(1);
        self.cycle_start_ms = Some(now_ms);
        self.state = ScanState::Idle;
        debug!("Bus: cycle done, {} device(s)", self.devices.len());
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
