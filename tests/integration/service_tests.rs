//! Integration tests for the IoService → filter → emitter pipeline on
//! directly wired GPIO points, outputs, resync and configuration.

use crate::mock_hw::{MockDevice, MockIo, RecordingEmitter};

use pointio::Error;
use pointio::adapters::config_store::MemConfigStore;
use pointio::app::commands::IoCommand;
use pointio::app::ports::{ConfigError, ConfigPort};
use pointio::app::service::IoService;
use pointio::config::SamplingConfig;
use pointio::points::{PointError, PointId, PointKind, PointSpec, PointTable, Reading};

const DOOR: PointId = PointId::new(0);
const LEVEL: PointId = PointId::new(1);
const RELAY: PointId = PointId::new(2);
const FAN: PointId = PointId::new(3);
const TEMP: PointId = PointId::new(4);

fn table() -> PointTable {
    PointTable::from_specs(&[
        PointSpec::new(PointKind::DigitalInput, 26, "door"),
        PointSpec::new(PointKind::AnalogInput, 32, "level"),
        PointSpec::new(PointKind::DigitalOutput, 12, "relay"),
        PointSpec::new(PointKind::PwmOutput, 13, "fan"),
        PointSpec::new(PointKind::BusSensor, 4, "temp"),
    ])
    .unwrap()
}

fn make_service(config: SamplingConfig) -> (IoService, MockIo, RecordingEmitter) {
    let svc = IoService::new(config, table()).unwrap();
    let mut io = MockIo::new();
    io.digital.insert(26, false);
    io.analog.insert(32, 0);
    (svc, io, RecordingEmitter::new())
}

/// Feed one digital level per tick and return the tick indices that
/// published the door input.
fn feed_door(
    svc: &mut IoService,
    io: &mut MockIo,
    out: &mut RecordingEmitter,
    levels: &[bool],
) -> Vec<usize> {
    let mut hits = Vec::new();
    for (i, level) in levels.iter().enumerate() {
        io.digital.insert(26, *level);
        let before = out.published_for(DOOR).len();
        svc.tick(i as u32 * 10, io, out);
        if out.published_for(DOOR).len() > before {
            hits.push(i);
        }
    }
    hits
}

// ── Digital debounce ──────────────────────────────────────────

#[test]
fn transient_flip_is_suppressed_and_stable_level_published_once() {
    let config = SamplingConfig { debounce_depth: 3, ..SamplingConfig::default() };
    let (mut svc, mut io, mut out) = make_service(config);

    let levels = [true, true, true, false, true, true, true, true];
    assert_eq!(feed_door(&mut svc, &mut io, &mut out, &levels), vec![7]);
    assert_eq!(out.published_for(DOOR), vec![Reading::Int(1)]);
}

#[test]
fn single_sample_glitch_never_publishes() {
    let config = SamplingConfig { debounce_depth: 1, ..SamplingConfig::default() };
    let (mut svc, mut io, mut out) = make_service(config);

    let levels = [true, false, true, false, false, false];
    assert!(feed_door(&mut svc, &mut io, &mut out, &levels).is_empty());
}

// ── Analog threshold ──────────────────────────────────────────

#[test]
fn analog_publishes_when_delta_reaches_threshold() {
    let config = SamplingConfig { analog_threshold: 10, ..SamplingConfig::default() };
    let (mut svc, mut io, mut out) = make_service(config);

    for (i, v) in [100u16, 105, 108, 112, 103].into_iter().enumerate() {
        io.analog.insert(32, v);
        svc.tick(i as u32, &mut io, &mut out);
    }
    assert_eq!(
        out.published_for(LEVEL),
        vec![Reading::Int(100), Reading::Int(112)]
    );
}

// ── Fault tolerance ───────────────────────────────────────────

#[test]
fn failed_read_keeps_last_value() {
    let config = SamplingConfig { debounce_depth: 0, ..SamplingConfig::default() };
    let (mut svc, mut io, mut out) = make_service(config);

    io.digital.insert(26, true);
    svc.tick(0, &mut io, &mut out);
    assert_eq!(out.published_for(DOOR), vec![Reading::Int(1)]);

    io.broken.push(26);
    io.digital.insert(26, false);
    svc.tick(10, &mut io, &mut out);
    svc.tick(20, &mut io, &mut out);
    assert_eq!(svc.point(DOOR).unwrap().raw_value, Reading::Int(1));
    assert_eq!(out.published_for(DOOR).len(), 1);
}

// ── Outputs ───────────────────────────────────────────────────

#[test]
fn outputs_are_driven_and_published_on_change() {
    let (mut svc, mut io, mut out) = make_service(SamplingConfig::default());

    svc.handle_command(IoCommand::SetOutput { point: RELAY, value: 1 }, &mut io, &mut out)
        .unwrap();
    svc.handle_command(IoCommand::SetOutput { point: FAN, value: 200 }, &mut io, &mut out)
        .unwrap();
    svc.handle_command(IoCommand::SetOutput { point: FAN, value: 200 }, &mut io, &mut out)
        .unwrap();

    assert_eq!(io.writes, vec![(12, 1), (13, 200), (13, 200)]);
    assert_eq!(out.published_for(RELAY), vec![Reading::Int(1)]);
    assert_eq!(out.published_for(FAN), vec![Reading::Int(200)]);

    let err = svc
        .handle_command(IoCommand::SetOutput { point: TEMP, value: 1 }, &mut io, &mut out)
        .unwrap_err();
    assert_eq!(err, Error::Point(PointError::NotAnOutput(TEMP)));
}

// ── Resync ────────────────────────────────────────────────────

#[test]
fn reconnect_republishes_every_valid_point_once() {
    let (mut svc, mut io, mut out) = make_service(SamplingConfig::default());
    io.devices.push(MockDevice::new(1, 4, Some(0), 19.5));
    io.analog.insert(32, 7);

    // One bus cycle so the temperature point holds a reading.
    for t in 0..6 {
        io.now_ms = t * 10;
        svc.tick(t * 10, &mut io, &mut out);
    }
    assert!(svc.point(TEMP).unwrap().valid);
    out.clear();

    svc.channel_connected();
    io.now_ms = 100;
    svc.tick(100, &mut io, &mut out);

    let ids: Vec<PointId> = out.published().iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![DOOR, LEVEL, RELAY, FAN, TEMP]);
    assert_eq!(out.published_for(LEVEL), vec![Reading::Int(7)]);
    assert_eq!(out.published_for(TEMP), vec![Reading::Float(19.5)]);

    out.clear();
    svc.tick(110, &mut io, &mut out);
    assert!(out.published().is_empty());
}

#[test]
fn resync_skips_bus_points_without_a_reading() {
    let (mut svc, mut io, mut out) = make_service(SamplingConfig::default());
    svc.handle_command(IoCommand::Resync, &mut io, &mut out).unwrap();

    let ids: Vec<PointId> = out.published().iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![DOOR, LEVEL, RELAY, FAN]);
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn runtime_config_update_changes_debounce() {
    let (mut svc, mut io, mut out) = make_service(SamplingConfig::default());

    // Default depth (16): three samples are not enough.
    assert!(feed_door(&mut svc, &mut io, &mut out, &[true, true, true]).is_empty());

    let config = SamplingConfig { debounce_depth: 2, ..SamplingConfig::default() };
    svc.handle_command(IoCommand::UpdateConfig(config), &mut io, &mut out).unwrap();

    // The pending counter survived the update and already exceeds depth 2.
    assert_eq!(feed_door(&mut svc, &mut io, &mut out, &[true]), vec![0]);
}

#[test]
fn stored_config_feeds_the_service() {
    let mut store = MemConfigStore::new();
    let json = br#"{"scan_interval_ms":2000,"debounce_depth":4}"#;
    store.save(&SamplingConfig::from_json(json).unwrap()).unwrap();

    let config = store.load().unwrap();
    let svc = IoService::new(config, table()).unwrap();
    assert_eq!(svc.config().scan_interval_ms, 2000);
    assert_eq!(svc.config().debounce_depth, 4);

    assert_eq!(
        SamplingConfig::from_json(br#"{"analog_threshold":300}"#),
        Err(ConfigError::ValidationFailed("analog_threshold must be in 1..=254"))
    );
}
