//! PointIO firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  HalGpio         Ds18b20Bus      LogEmitter   MemConfig  │
//! │  (GpioPort)      (BusPort)       (Emitter)    (Config)   │
//! │                                                          │
//! │  ───────────── Port Trait Boundary ─────────────         │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │   IoService: PointTable · Filter · BusScanner  │      │
//! │  └────────────────────────────────────────────────┘      │
//! │                                                          │
//! │  Cooperative loop: one tick every LOOP_PERIOD_MS         │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{IOPin, InputPin, OutputPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use pointio::adapters::board::Board;
use pointio::adapters::config_store::MemConfigStore;
use pointio::adapters::hal_gpio::HalGpio;
use pointio::adapters::log_emitter::LogEmitter;
use pointio::adapters::time::MonotonicClock;
use pointio::app::ports::ConfigPort;
use pointio::app::service::IoService;
use pointio::config::SamplingConfig;
use pointio::drivers::ds18b20::Ds18b20Bus;
use pointio::drivers::onewire::OneWire;
use pointio::points::{PointKind, PointSpec, PointTable};

/// Scheduler period.  Bounds input latency and conversion polling rate.
const LOOP_PERIOD_MS: u32 = 10;

/// Ticks between scanner counter dumps (one minute at the loop period).
const STATS_EVERY_TICKS: u64 = 6_000;

const PIN_DOOR: u8 = 26;
const PIN_RELAY: u8 = 12;
const LINE_TEMP: u8 = 4;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("PointIO v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config (defaults until a persistence layer seeds the store) ──
    let store = MemConfigStore::new();
    let config = match store.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            SamplingConfig::default()
        }
    };

    // ── 3. Hardware ───────────────────────────────────────────
    let p = Peripherals::take()?;

    let door = PinDriver::input(p.pins.gpio26.downgrade_input())?;
    let relay = PinDriver::output(p.pins.gpio12.downgrade_output())?;
    let gpio: HalGpio<_, _> = HalGpio::new()
        .with_input(PIN_DOOR, door)
        .and_then(|g| g.with_output(PIN_RELAY, relay))
        .map_err(|e| anyhow::anyhow!("GPIO setup: {e}"))?;

    let wire = PinDriver::input_output_od(p.pins.gpio4.downgrade())?;
    let wire = OneWire::new(wire, Ets).map_err(|e| anyhow::anyhow!("1-Wire setup: {e}"))?;
    let bus = Ds18b20Bus::new()
        .with_line(LINE_TEMP, wire)
        .map_err(|_| anyhow::anyhow!("1-Wire line table full"))?;

    let mut board = Board::new(gpio, bus);

    // ── 4. Points + service ───────────────────────────────────
    let points = PointTable::from_specs(&[
        PointSpec::new(PointKind::DigitalInput, PIN_DOOR, "door"),
        PointSpec::new(PointKind::DigitalOutput, PIN_RELAY, "relay"),
        PointSpec::new(PointKind::BusSensor, LINE_TEMP, "temp"),
    ])
    .map_err(|e| anyhow::anyhow!("point table: {e}"))?;

    let mut service = IoService::new(config, points)?;
    let mut emitter = LogEmitter::new();
    let clock = MonotonicClock::new();

    // The log console is always "connected": publish a full snapshot once.
    service.channel_connected();

    info!("System ready. Entering loop.");

    // ── 5. Cooperative loop ───────────────────────────────────
    loop {
        service.tick(clock.uptime_ms(), &mut board, &mut emitter);
        if service.tick_count() % STATS_EVERY_TICKS == 0 {
            emitter.log_stats(&service.scan_stats());
        }
        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
