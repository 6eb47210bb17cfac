//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements   | Connects to                       |
//! |----------------|--------------|-----------------------------------|
//! | `board`        | GpioPort     | any GpioPort (forwarding)         |
//! |                | BusPort      | any BusPort (forwarding)          |
//! | `config_store` | ConfigPort   | in-memory postcard blob           |
//! | `hal_gpio`     | GpioPort     | embedded-hal pins, PWM, ADC       |
//! | `log_emitter`  | Emitter      | Serial log output                 |
//! | `time`         | (none)       | ESP32 system timer / host clock   |
//!
//! The DS18B20 `BusPort` lives with its wire driver in
//! [`drivers::ds18b20`](crate::drivers::ds18b20).

pub mod board;
pub mod config_store;
pub mod hal_gpio;
pub mod log_emitter;
pub mod time;
