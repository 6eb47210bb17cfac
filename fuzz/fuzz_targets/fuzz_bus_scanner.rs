//! Fuzz target: `BusScanner::step`
//!
//! Every byte of input decides one answer the bus gives: which addresses
//! a line reports, whether a conversion request is accepted, whether a
//! conversion is done, what value comes back, and how far the clock moves.
//! The scanner must never panic or index past its device list.
//!
//! cargo fuzz run fuzz_bus_scanner

#![no_main]

use libfuzzer_sys::fuzz_target;
use pointio::app::ports::{BusPort, Emitter};
use pointio::bus::address::DeviceAddress;
use pointio::bus::{BusScanner, ScanState};
use pointio::config::SamplingConfig;
use pointio::filter::SampleFilter;
use pointio::points::{PointId, PointKind, PointSpec, PointTable, Reading};

struct ByteBus<'a> {
    data: &'a [u8],
    pos: usize,
}

impl ByteBus<'_> {
    fn next(&mut self) -> u8 {
        let b = self.data.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        b
    }
}

impl BusPort for ByteBus<'_> {
    fn reset_and_enumerate(&mut self, _line: u8, found: &mut dyn FnMut(DeviceAddress)) {
        let n = self.next() % 24;
        for _ in 0..n {
            let serial = [self.next(), self.next(), 0, 0, 0, 0];
            let mut addr = DeviceAddress::with_crc(0x28, serial);
            if self.next() & 0x07 == 0 {
                addr.0[7] ^= 0x5A;
            }
            found(addr);
        }
    }

    fn begin_conversion(&mut self, _line: u8, _address: &DeviceAddress) -> bool {
        self.next() & 0x03 != 0
    }

    fn is_conversion_complete(&mut self, _line: u8, _address: &DeviceAddress) -> bool {
        self.next() & 0x01 != 0
    }

    fn read_value(&mut self, _line: u8, _address: &DeviceAddress) -> f32 {
        let raw = i16::from_le_bytes([self.next(), self.next()]);
        f32::from(raw) / 16.0
    }
}

struct Sink;

impl Emitter for Sink {
    fn publish(&mut self, _point: PointId, value: Reading) {
        assert!(matches!(value, Reading::Float(v) if v.is_finite()));
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let config = SamplingConfig {
        bus_device_capacity: (data[0] % 16) + 1,
        bus_delta_threshold: f32::from(data[1] % 8) / 4.0,
        ..SamplingConfig::default()
    };
    let mut scanner = BusScanner::new(&config);
    let filter = SampleFilter::new(&config);
    let Ok(mut points) = PointTable::from_specs(&[
        PointSpec::new(PointKind::BusSensor, 0, "a"),
        PointSpec::new(PointKind::BusSensor, 1, "b"),
    ]) else {
        return;
    };
    let mut bus = ByteBus { data: &data[2..], pos: 0 };

    let mut now = 0u32;
    while bus.pos < bus.data.len() {
        let state = scanner.step(now, &mut bus, &mut points, &filter, &mut Sink);
        assert!(scanner.devices().len() <= usize::from(config.bus_device_capacity));
        if matches!(state, ScanState::ConversionRequested | ScanState::AwaitingConversion) {
            assert!(scanner.cursor() < scanner.devices().len());
        }
        now = now.wrapping_add(u32::from(bus.next()) * 8);
    }
});
