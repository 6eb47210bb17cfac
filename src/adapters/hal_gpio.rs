//! GPIO adapter over `embedded-hal` 1.0 pin traits.
//!
//! Maps board pin numbers to concrete drivers so the core can address
//! pins by number.  Any HAL works: ESP-IDF `PinDriver`s and `LedcDriver`s
//! on the device, `embedded-hal-mock` style doubles on the host.
//!
//! embedded-hal 1.0 has no ADC trait, so analog channels go through the
//! small [`AnalogChannel`] trait defined here.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use crate::app::ports::{GpioError, GpioPort};

/// Pins of one kind an adapter can hold.
pub const MAX_PINS: usize = 16;

/// A single ADC channel returning raw counts.
pub trait AnalogChannel {
    type Error: core::fmt::Debug;

    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

/// Placeholder for boards without analog inputs (or without PWM outputs,
/// via [`NoPwm`]).
#[derive(Debug)]
pub enum NoAnalog {}

impl AnalogChannel for NoAnalog {
    type Error = core::convert::Infallible;

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        match *self {}
    }
}

#[derive(Debug)]
pub enum NoPwm {}

impl embedded_hal::pwm::ErrorType for NoPwm {
    type Error = core::convert::Infallible;
}

impl SetDutyCycle for NoPwm {
    fn max_duty_cycle(&self) -> u16 {
        match *self {}
    }

    fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), Self::Error> {
        match *self {}
    }
}

type Slots<T> = heapless::Vec<(u8, T), MAX_PINS>;

/// Number-addressed GPIO over embedded-hal drivers.
///
/// `I` digital inputs, `O` digital outputs, `P` PWM channels, `A` ADC
/// channels.
pub struct HalGpio<I, O, P = NoPwm, A = NoAnalog> {
    inputs: Slots<I>,
    outputs: Slots<O>,
    pwm: Slots<P>,
    analog: Slots<A>,
}

impl<I, O, P, A> Default for HalGpio<I, O, P, A> {
    fn default() -> Self {
        Self {
            inputs: heapless::Vec::new(),
            outputs: heapless::Vec::new(),
            pwm: heapless::Vec::new(),
            analog: heapless::Vec::new(),
        }
    }
}

impl<I, O, P, A> HalGpio<I, O, P, A>
where
    I: InputPin,
    O: OutputPin,
    P: SetDutyCycle,
    A: AnalogChannel,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, pin: u8, driver: I) -> Result<Self, GpioError> {
        self.inputs.push((pin, driver)).map_err(|_| GpioError::TableFull(pin))?;
        Ok(self)
    }

    pub fn with_output(mut self, pin: u8, driver: O) -> Result<Self, GpioError> {
        self.outputs.push((pin, driver)).map_err(|_| GpioError::TableFull(pin))?;
        Ok(self)
    }

    pub fn with_pwm(mut self, pin: u8, driver: P) -> Result<Self, GpioError> {
        self.pwm.push((pin, driver)).map_err(|_| GpioError::TableFull(pin))?;
        Ok(self)
    }

    pub fn with_analog(mut self, pin: u8, channel: A) -> Result<Self, GpioError> {
        self.analog.push((pin, channel)).map_err(|_| GpioError::TableFull(pin))?;
        Ok(self)
    }
}

fn slot<T>(slots: &mut Slots<T>, pin: u8) -> Result<&mut T, GpioError> {
    slots
        .iter_mut()
        .find(|(p, _)| *p == pin)
        .map(|(_, d)| d)
        .ok_or(GpioError::UnknownPin(pin))
}

impl<I, O, P, A> GpioPort for HalGpio<I, O, P, A>
where
    I: InputPin,
    O: OutputPin,
    P: SetDutyCycle,
    A: AnalogChannel,
{
    fn read_digital(&mut self, pin: u8) -> Result<bool, GpioError> {
        slot(&mut self.inputs, pin)?.is_high().map_err(|e| {
            debug!("GPIO {}: read error {:?}", pin, e);
            GpioError::ReadFailed(pin)
        })
    }

    fn read_analog(&mut self, pin: u8) -> Result<u16, GpioError> {
        slot(&mut self.analog, pin)?.read_raw().map_err(|e| {
            debug!("ADC {}: read error {:?}", pin, e);
            GpioError::ReadFailed(pin)
        })
    }

    fn write_digital(&mut self, pin: u8, high: bool) -> Result<(), GpioError> {
        let out = slot(&mut self.outputs, pin)?;
        let r = if high { out.set_high() } else { out.set_low() };
        r.map_err(|_| GpioError::WriteFailed(pin))
    }

    fn write_pwm(&mut self, pin: u8, duty: u8) -> Result<(), GpioError> {
        slot(&mut self.pwm, pin)?
            .set_duty_cycle_fraction(u16::from(duty), 255)
            .map_err(|_| GpioError::WriteFailed(pin))
    }
}
