//! Board adapter: one value that satisfies every hardware port.
//!
//! [`IoService::tick`](crate::app::service::IoService::tick) takes a single
//! `GpioPort + BusPort` so both can be driven without a double mutable
//! borrow.  `Board` pairs a GPIO adapter with a bus adapter and forwards
//! each trait to the half that owns it.

use crate::app::ports::{BusPort, GpioError, GpioPort};
use crate::bus::address::DeviceAddress;

/// Concrete adapter that combines pins and bus lines behind port traits.
pub struct Board<G, B> {
    pub gpio: G,
    pub bus: B,
}

impl<G, B> Board<G, B> {
    pub fn new(gpio: G, bus: B) -> Self {
        Self { gpio, bus }
    }
}

// ── GpioPort implementation ───────────────────────────────────

impl<G: GpioPort, B> GpioPort for Board<G, B> {
    fn read_digital(&mut self, pin: u8) -> Result<bool, GpioError> {
        self.gpio.read_digital(pin)
    }

    fn read_analog(&mut self, pin: u8) -> Result<u16, GpioError> {
        self.gpio.read_analog(pin)
    }

    fn write_digital(&mut self, pin: u8, high: bool) -> Result<(), GpioError> {
        self.gpio.write_digital(pin, high)
    }

    fn write_pwm(&mut self, pin: u8, duty: u8) -> Result<(), GpioError> {
        self.gpio.write_pwm(pin, duty)
    }
}

// ── BusPort implementation ────────────────────────────────────

impl<G, B: BusPort> BusPort for Board<G, B> {
    fn reset_and_enumerate(&mut self, line: u8, found: &mut dyn FnMut(DeviceAddress)) {
        self.bus.reset_and_enumerate(line, found);
    }

    fn begin_conversion(&mut self, line: u8, address: &DeviceAddress) -> bool {
        self.bus.begin_conversion(line, address)
    }

    fn is_conversion_complete(&mut self, line: u8, address: &DeviceAddress) -> bool {
        self.bus.is_conversion_complete(line, address)
    }

    fn read_value(&mut self, line: u8, address: &DeviceAddress) -> f32 {
        self.bus.read_value(line, address)
    }
}
