//! Module describing the [`BusDriver`] trait and the bit-banging implementation built on the
//! [`Pins`] and [`DelayNs`] capabilities.

use embedded_hal_1::delay::DelayNs;
use embedded_hal_1::digital::PinState;

use crate::error::BusError;

/// This trait represents some low-level implementation of the TM1638 bus interface.
///
/// The TM1638 uses a three-wire bus similar to SPI, but not so similar that we can just use an SPI
/// implementation instead: data goes LSB first over a single bidirectional DIO line, framed by
/// the STB line.  This trait exposes a byte-level interface that must be implemented in terms of
/// bit-level I/O, either using bit-banging ([`BitBangingBusDriver`]), PIO, or maybe some hacked
/// version of an SPI peripheral.
///
/// Every method is one transaction: strobe goes low once before the first byte and high once
/// after the last.
pub trait BusDriver {
    type Error;

    /// Send a single command, with no payload, and no response expected
    fn send_command(&mut self, b: u8) -> Result<(), Self::Error>;

    /// Send a command with a data payload, but no response expected.
    fn send_command_write_data(&mut self, b: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Send a command which is expected to generate a response.
    ///
    /// The expected size of the response (in bytes) is determined by the size of the `data` slice.
    /// This operation will return once enough bytes are received to fill `data`.
    fn send_command_read_data(&mut self, b: u8, data: &mut [u8]) -> Result<(), Self::Error>;

    /// Let go of the bus pins, leaving them as low inputs.
    fn release(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// The three pins of the TM1638 bus, as seen by the bus master.
///
/// Sadly, due to [this issue](https://github.com/rust-embedded/embedded-hal/issues/397), there is
/// no Embedded HAL abstraction for a pin that switches between input and output at runtime, which
/// is exactly what DIO needs.  Implement this trait for your platform, or use one of the built-in
/// implementations in [`crate::pins`].
pub trait Pins {
    type Error;

    /// Configure all pins as outputs in the idle state: STB high, CLK low, DIO low.
    fn init(&mut self) -> Result<(), Self::Error>;

    fn set_clock(&mut self, state: PinState) -> Result<(), Self::Error>;

    fn set_strobe(&mut self, state: PinState) -> Result<(), Self::Error>;

    /// Drive DIO.  Only called while DIO is an output.
    fn set_data(&mut self, state: PinState) -> Result<(), Self::Error>;

    /// Sample DIO.  Only called while DIO is an input.
    fn read_data(&mut self) -> Result<PinState, Self::Error>;

    /// Stop driving DIO so the controller can answer on it
    fn data_as_input(&mut self) -> Result<(), Self::Error>;

    /// Drive DIO from the host again
    fn data_as_output(&mut self) -> Result<(), Self::Error>;

    /// Switch all pins to inputs and pull their output latches low.
    fn release(&mut self) -> Result<(), Self::Error>;
}

/// Bus timing, in nanoseconds.
///
/// The datasheet (section 12, Timing Characteristics) asks for at least 1us of clock pulse width
/// and the same tWAIT between the read command and the first clock of the answer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// How long to hold each clock level
    pub half_cycle_ns: u32,

    /// How long to wait after releasing DIO, before clocking in the response
    pub twait_ns: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            half_cycle_ns: 1_000,
            twait_ns: 1_000,
        }
    }
}

/// [`DelayNs`] that doesn't wait at all, for hosts slow enough that a GPIO write already takes
/// longer than the TM1638's minimum pulse width.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    #[inline]
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Who is driving the DIO line
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataDirection {
    /// The host drives DIO; the normal state
    Output,

    /// The controller drives DIO; only while key scan data is being clocked in
    Input,
}

/// Implementation of [`BusDriver`] that bit-bangs the protocol over any [`Pins`] implementation,
/// pausing with any [`DelayNs`] implementation.
pub struct BitBangingBusDriver<P: Pins, D: DelayNs> {
    pins: P,
    delay: D,
    timing: Timing,
    direction: DataDirection,
}

impl<P: Pins, D: DelayNs> BitBangingBusDriver<P, D> {
    /// Take ownership of the pins and put them in their idle state.
    pub fn new(mut pins: P, delay: D, timing: Timing) -> Result<Self, P::Error> {
        pins.init()?;

        Ok(Self {
            pins,
            delay,
            timing,
            direction: DataDirection::Output,
        })
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn direction(&self) -> DataDirection {
        self.direction
    }

    /// Give back the pins and the delay
    pub fn free(self) -> (P, D) {
        (self.pins, self.delay)
    }

    fn switch_to_input(&mut self) -> Result<(), BusError<P::Error>> {
        if self.direction == DataDirection::Output {
            self.pins.data_as_input()?;
            self.direction = DataDirection::Input;
        }

        Ok(())
    }

    fn switch_to_output(&mut self) -> Result<(), BusError<P::Error>> {
        if self.direction == DataDirection::Input {
            self.pins.data_as_output()?;
            self.direction = DataDirection::Output;
        }

        Ok(())
    }

    fn half_cycle(&mut self) {
        self.delay.delay_ns(self.timing.half_cycle_ns);
    }

    /// Shift the byte value out on the DIO pin, LSB first.
    ///
    /// The controller latches DIO on the rising edge of CLK, so DIO only changes while CLK is low.
    fn write_byte(&mut self, b: u8) -> Result<(), BusError<P::Error>> {
        if self.direction != DataDirection::Output {
            return Err(BusError::DataLineNotOutput);
        }

        for bit in 0..8 {
            self.pins.set_clock(PinState::Low)?;
            self.half_cycle();
            self.pins.set_data(PinState::from(b & (1 << bit) != 0))?;
            self.pins.set_clock(PinState::High)?;
            self.half_cycle();
        }

        Ok(())
    }

    /// Shift a byte value in from the DIO pin, LSB first, using the CLK pin to drive the
    /// controller to send data.
    ///
    /// DIO is handed back to the host before returning, even if a pin operation fails part way.
    fn read_byte(&mut self) -> Result<u8, BusError<P::Error>> {
        self.switch_to_input()?;
        self.delay.delay_ns(self.timing.twait_ns);

        let result = self.shift_byte_in();
        let restored = self.switch_to_output();

        let value = result?;
        restored?;

        Ok(value)
    }

    fn shift_byte_in(&mut self) -> Result<u8, BusError<P::Error>> {
        let mut value = 0;

        for bit in 0..8 {
            self.pins.set_clock(PinState::Low)?;
            self.half_cycle();

            if self.pins.read_data()? == PinState::High {
                value |= 1 << bit;
            }

            self.pins.set_clock(PinState::High)?;
            self.half_cycle();
        }

        Ok(value)
    }

    /// Run `f` with strobe held low.  Strobe is raised again even if `f` fails, so a failed
    /// transaction doesn't swallow the next one.
    fn strobed<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, BusError<P::Error>>,
    ) -> Result<T, BusError<P::Error>> {
        self.pins.set_strobe(PinState::Low)?;
        let result = f(self);
        let released = self.pins.set_strobe(PinState::High);

        let value = result?;
        released?;

        Ok(value)
    }
}

impl<P: Pins, D: DelayNs> BusDriver for BitBangingBusDriver<P, D> {
    type Error = BusError<P::Error>;

    /// Send a single byte that represents a command, so strobe will be pulled low
    /// before the command's bits are sent, and then pulled high again after.
    fn send_command(&mut self, b: u8) -> Result<(), Self::Error> {
        self.strobed(|me| me.write_byte(b))
    }

    /// Send a single byte that represents a command followed by one or more data bytes, so strobe
    /// will be pulled low before the command's bits are sent, and not pulled high again
    /// until after the data bytes are sent.
    fn send_command_write_data(&mut self, b: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.strobed(|me| {
            me.write_byte(b)?;
            for b in data {
                #[cfg(feature = "defmt")]
                defmt::trace!("data byte = {=u8:x}", *b);
                me.write_byte(*b)?;
            }

            Ok(())
        })
    }

    /// Send a single byte that represents a command and which expects a response back from the
    /// controller, so strobe will be pulled low before the command's bits are sent, and then
    /// pulled high again after all bytes are read.
    fn send_command_read_data(&mut self, b: u8, data: &mut [u8]) -> Result<(), Self::Error> {
        self.strobed(|me| {
            me.write_byte(b)?;

            #[cfg(feature = "defmt")]
            defmt::trace!("Expecting {0} bytes from controller", data.len());

            for byte in data.iter_mut() {
                *byte = me.read_byte()?;
            }

            Ok(())
        })
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.pins.release()?;
        // Whatever was configured before, `init` starts over from output
        self.direction = DataDirection::Output;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pins that fail every operation once `budget` operations have succeeded
    struct FailingPins {
        budget: usize,
        data_is_input: bool,
    }

    impl FailingPins {
        fn spend(&mut self) -> Result<(), ()> {
            if self.budget == 0 {
                Err(())
            } else {
                self.budget -= 1;
                Ok(())
            }
        }
    }

    impl Pins for FailingPins {
        type Error = ();

        fn init(&mut self) -> Result<(), ()> {
            Ok(())
        }

        fn set_clock(&mut self, _state: PinState) -> Result<(), ()> {
            self.spend()
        }

        fn set_strobe(&mut self, _state: PinState) -> Result<(), ()> {
            Ok(())
        }

        fn set_data(&mut self, _state: PinState) -> Result<(), ()> {
            self.spend()
        }

        fn read_data(&mut self) -> Result<PinState, ()> {
            self.spend().map(|_| PinState::Low)
        }

        fn data_as_input(&mut self) -> Result<(), ()> {
            self.data_is_input = true;
            Ok(())
        }

        fn data_as_output(&mut self) -> Result<(), ()> {
            self.data_is_input = false;
            Ok(())
        }

        fn release(&mut self) -> Result<(), ()> {
            Ok(())
        }
    }

    #[test]
    fn failed_read_restores_output() {
        // Enough budget for the 8 clock lows and 8 data writes of the command, plus a few more
        let pins = FailingPins {
            budget: 8 * 3 + 3,
            data_is_input: false,
        };
        let mut driver = BitBangingBusDriver::new(pins, NoDelay, Timing::default()).unwrap();

        let mut buffer = [0u8; 4];
        assert_eq!(
            Err(BusError::Pin(())),
            driver.send_command_read_data(0x42, &mut buffer)
        );

        assert_eq!(DataDirection::Output, driver.direction());
        let (pins, _) = driver.free();
        assert!(!pins.data_is_input);
    }

    #[test]
    fn write_refused_while_input() {
        let pins = FailingPins {
            budget: usize::MAX,
            data_is_input: false,
        };
        let mut driver = BitBangingBusDriver::new(pins, NoDelay, Timing::default()).unwrap();

        driver.switch_to_input().unwrap();
        assert_eq!(Err(BusError::DataLineNotOutput), driver.write_byte(0x40));

        driver.switch_to_output().unwrap();
        assert_eq!(Ok(()), driver.write_byte(0x40));
    }
}
