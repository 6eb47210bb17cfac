//! PointIO: point sampling and bus acquisition core for I/O node firmware.
//!
//! Exposes the pure-logic modules for integration testing and for the
//! firmware binary.  All ESP-IDF-specific code is guarded by
//! `#[cfg(feature = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod bus;
pub mod config;
pub mod error;
pub mod filter;
pub mod points;

pub mod adapters;
pub mod drivers;

pub use error::{Error, Result};
