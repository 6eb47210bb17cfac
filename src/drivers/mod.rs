//! Bus drivers.

pub mod ds18b20;
pub mod onewire;
