//! Integration tests for bus acquisition through `IoService::tick`.
//!
//! The mock bus completes conversions against `MockIo::now_ms`, which the
//! rig advances in lock-step with the service clock.

use crate::mock_hw::{MockDevice, MockIo, RecordingEmitter};

use pointio::app::service::IoService;
use pointio::bus::ScanState;
use pointio::bus::address::DeviceAddress;
use pointio::config::SamplingConfig;
use pointio::points::{PointId, PointKind, PointSpec, PointTable, Reading};

const TICK_MS: u32 = 10;

struct Rig {
    svc: IoService,
    io: MockIo,
    out: RecordingEmitter,
    now: u32,
}

impl Rig {
    fn new(config: SamplingConfig, lines: &[u8], devices: Vec<MockDevice>) -> Self {
        let specs: Vec<PointSpec> = lines
            .iter()
            .map(|l| PointSpec::new(PointKind::BusSensor, *l, "temp"))
            .collect();
        let points = PointTable::from_specs(&specs).unwrap();
        Self {
            svc: IoService::new(config, points).unwrap(),
            io: MockIo::with_devices(devices),
            out: RecordingEmitter::new(),
            now: 0,
        }
    }

    fn tick(&mut self) -> ScanState {
        self.io.now_ms = self.now;
        self.svc.tick(self.now, &mut self.io, &mut self.out);
        self.now = self.now.wrapping_add(TICK_MS);
        self.svc.scan_state()
    }

    /// Tick until the clock passes `until_ms`.
    fn run_until(&mut self, until_ms: u32) {
        while self.now <= until_ms {
            self.tick();
        }
    }

    /// Tick until the scanner is back in Idle after leaving it.
    fn run_cycle(&mut self) {
        while self.tick() == ScanState::Idle {}
        while self.tick() != ScanState::Idle {}
    }
}

fn p(i: u8) -> PointId {
    PointId::new(i)
}

#[test]
fn first_tick_starts_a_scan() {
    let dev = MockDevice::new(1, 4, Some(10), 20.0);
    let mut rig = Rig::new(SamplingConfig::default(), &[4], vec![dev]);
    assert_eq!(rig.tick(), ScanState::Scanning);
}

#[test]
fn slow_device_times_out_while_fast_one_publishes() {
    let a = MockDevice::new(1, 4, Some(200), 21.5);
    let b = MockDevice::new(2, 4, None, 0.0);
    let mut rig = Rig::new(SamplingConfig::default(), &[4], vec![a, b]);

    // t=0 scan start, t=10 line walk, t=20 list done, t=30 request A.
    rig.run_until(220);
    assert!(rig.out.published().is_empty(), "A still converting");
    rig.run_until(230);
    assert_eq!(rig.out.published_for(p(0)), vec![Reading::Float(21.5)]);

    // B requested at t=240 and abandoned once 950 ms have strictly passed.
    rig.run_until(1190);
    assert_eq!(rig.svc.scan_state(), ScanState::AwaitingConversion);
    rig.run_until(1200);
    assert_eq!(rig.svc.scan_state(), ScanState::Idle);

    let stats = rig.svc.scan_stats();
    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.cycles, 1);
    assert_eq!(rig.out.published().len(), 1);

    // Next cycle no earlier than one interval after the last one ended.
    rig.run_until(2190);
    assert_eq!(rig.svc.scan_state(), ScanState::Idle);
    rig.run_until(2200);
    assert_eq!(rig.svc.scan_state(), ScanState::Scanning);
}

#[test]
fn unplugged_device_disappears_on_next_cycle() {
    let a = MockDevice::new(1, 4, Some(0), 20.0);
    let b = MockDevice::new(2, 4, Some(0), 22.0);
    let b_addr = b.address;
    let mut rig = Rig::new(SamplingConfig::default(), &[4], vec![a, b]);

    rig.run_cycle();
    assert_eq!(rig.svc.bus_devices().len(), 2);

    rig.io.unplug(&b_addr);
    rig.run_cycle();
    let addrs: Vec<DeviceAddress> = rig.svc.bus_devices().iter().map(|d| d.address).collect();
    assert_eq!(addrs.len(), 1);
    assert!(!addrs.contains(&b_addr));
    assert_eq!(rig.svc.scan_stats().cycles, 2);
}

#[test]
fn device_unplugged_mid_cycle_is_skipped() {
    let a = MockDevice::new(1, 4, Some(100), 20.0);
    let b = MockDevice::new(2, 4, Some(0), 22.0);
    let b_addr = b.address;
    let mut rig = Rig::new(SamplingConfig::default(), &[4], vec![a, b]);

    rig.run_until(50);
    assert_eq!(rig.svc.scan_state(), ScanState::AwaitingConversion);
    rig.io.unplug(&b_addr);
    while rig.tick() != ScanState::Idle {}

    let stats = rig.svc.scan_stats();
    assert_eq!(stats.rejected_requests, 1);
    assert_eq!(stats.cycles, 1);
    assert_eq!(rig.out.published_for(p(0)), vec![Reading::Float(20.0)]);
}

#[test]
fn lost_sensor_invalidates_its_point() {
    let a = MockDevice::new(1, 4, Some(0), 20.0);
    let addr = a.address;
    let mut rig = Rig::new(SamplingConfig::default(), &[4], vec![a]);

    rig.run_cycle();
    assert!(rig.svc.point(p(0)).unwrap().valid);

    rig.io.unplug(&addr);
    rig.out.clear();
    rig.run_cycle();
    assert!(!rig.svc.point(p(0)).unwrap().valid);
    assert_eq!(rig.out.invalidated(), vec![p(0)]);
    assert!(rig.out.published().is_empty());
}

#[test]
fn replugged_sensor_is_announced_again() {
    let config = SamplingConfig { bus_delta_threshold: 0.5, ..SamplingConfig::default() };
    let dev = MockDevice::new(1, 4, Some(0), 0.25);
    let addr = dev.address;
    let mut rig = Rig::new(config, &[4], vec![dev.clone()]);

    rig.run_cycle();
    assert_eq!(rig.out.published_for(p(0)), vec![Reading::Float(0.25)]);

    rig.io.unplug(&addr);
    rig.run_cycle();
    assert_eq!(rig.out.invalidated(), vec![p(0)]);

    rig.io.devices.push(dev);
    rig.out.clear();
    rig.run_cycle();
    assert_eq!(rig.out.published_for(p(0)), vec![Reading::Float(0.25)]);
    assert!(rig.svc.point(p(0)).unwrap().valid);
}

#[test]
fn corrupt_and_excess_addresses_are_dropped() {
    let config = SamplingConfig { bus_device_capacity: 2, ..SamplingConfig::default() };
    let devices = (1..=3).map(|s| MockDevice::new(s, 4, Some(0), f32::from(s))).collect();
    let mut rig = Rig::new(config, &[4], devices);
    let mut bad = DeviceAddress::with_crc(0x28, [9, 9, 9, 9, 9, 9]);
    bad.0[1] ^= 0x40;
    rig.io.noise.push((4, bad));

    rig.run_cycle();
    let stats = rig.svc.scan_stats();
    assert_eq!(rig.svc.bus_devices().len(), 2);
    assert_eq!(stats.capacity_drops, 1);
    assert_eq!(stats.crc_rejects, 1);
    assert!(!rig.io.requests.contains(&bad));
}

#[test]
fn each_line_feeds_its_own_point() {
    let mut rig = Rig::new(
        SamplingConfig::default(),
        &[4, 5],
        vec![MockDevice::new(1, 4, Some(0), 18.0), MockDevice::new(2, 5, Some(0), 30.5)],
    );
    rig.run_cycle();

    assert_eq!(rig.out.published_for(p(0)), vec![Reading::Float(18.0)]);
    assert_eq!(rig.out.published_for(p(1)), vec![Reading::Float(30.5)]);
    let owners: Vec<_> = rig.svc.bus_devices().iter().map(|d| (d.line, d.owner)).collect();
    assert_eq!(owners, vec![(4, p(0)), (5, p(1))]);
}

#[test]
fn bus_delta_threshold_suppresses_small_changes() {
    let config = SamplingConfig { bus_delta_threshold: 0.5, ..SamplingConfig::default() };
    let dev = MockDevice::new(1, 4, Some(0), 20.0);
    let addr = dev.address;
    let mut rig = Rig::new(config, &[4], vec![dev]);

    for v in [20.0, 20.25, 20.4, 20.6] {
        rig.io.device_mut(&addr).unwrap().value = v;
        rig.run_cycle();
    }
    assert_eq!(
        rig.out.published_for(p(0)),
        vec![Reading::Float(20.0), Reading::Float(20.6)]
    );
}

#[test]
fn disconnected_reading_keeps_point_invalid() {
    let dev = MockDevice::new(1, 4, Some(0), pointio::bus::DISCONNECTED_C);
    let mut rig = Rig::new(SamplingConfig::default(), &[4], vec![dev]);
    rig.run_cycle();

    assert!(rig.out.published().is_empty());
    assert!(!rig.svc.point(p(0)).unwrap().valid);
    assert_eq!(rig.svc.scan_stats().invalid_reads, 1);
}
