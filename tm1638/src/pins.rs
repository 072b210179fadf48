//! Built-in [`Pins`] implementations.

use embedded_hal_1::digital::{ErrorType, InputPin, OutputPin, PinState};

use crate::bus::Pins;

/// [`Pins`] over plain Embedded HAL 1.0 pins.
///
/// Embedded HAL can't switch a pin's direction at runtime, so DIO has to be a pin that is both an
/// [`InputPin`] and an [`OutputPin`], which in practice means an open-drain output with a pull-up
/// (most TM1638 boards have one on DIO).  Switching DIO to "input" lets the line float high so the
/// controller can pull it low.
///
/// [`Pins::release`] can't reconfigure these pins either, so it only drives all three low.
pub struct OpenDrainPins<Clk, Dio, Stb> {
    clock: Clk,
    dio: Dio,
    strobe: Stb,
}

impl<Clk, Dio, Stb> OpenDrainPins<Clk, Dio, Stb> {
    pub fn new(clock: Clk, dio: Dio, strobe: Stb) -> Self {
        Self { clock, dio, strobe }
    }

    /// Give back the clock, DIO and strobe pins
    pub fn free(self) -> (Clk, Dio, Stb) {
        (self.clock, self.dio, self.strobe)
    }
}

impl<Clk, Dio, Stb> Pins for OpenDrainPins<Clk, Dio, Stb>
where
    Clk: OutputPin,
    Dio: InputPin + OutputPin + ErrorType<Error = Clk::Error>,
    Stb: OutputPin + ErrorType<Error = Clk::Error>,
{
    type Error = Clk::Error;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.strobe.set_high()?;
        self.dio.set_low()?;
        self.clock.set_low()
    }

    fn set_clock(&mut self, state: PinState) -> Result<(), Self::Error> {
        self.clock.set_state(state)
    }

    fn set_strobe(&mut self, state: PinState) -> Result<(), Self::Error> {
        self.strobe.set_state(state)
    }

    fn set_data(&mut self, state: PinState) -> Result<(), Self::Error> {
        self.dio.set_state(state)
    }

    fn read_data(&mut self) -> Result<PinState, Self::Error> {
        Ok(PinState::from(self.dio.is_high()?))
    }

    fn data_as_input(&mut self) -> Result<(), Self::Error> {
        self.dio.set_high()
    }

    fn data_as_output(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.dio.set_low()?;
        self.clock.set_low()?;
        self.strobe.set_low()
    }
}

#[cfg(feature = "embassy-rp")]
mod embassy_rp_pins {
    use core::convert::Infallible;
    use embassy_rp::gpio::{self, Flex, Level};
    use embedded_hal_1::digital::PinState;

    /// [`super::Pins`] implementation using the Embassy RP HAL for the RP2040 microcontroller.
    ///
    /// All three pins are [`Flex`] pins so that DIO can really be switched between output and
    /// input, and so that all of them can be released to inputs on shutdown.
    pub struct EmbassyRpPins<'a, StrobePin: gpio::Pin, ClockPin: gpio::Pin, DioPin: gpio::Pin> {
        strobe: Flex<'a, StrobePin>,
        clock: Flex<'a, ClockPin>,
        dio: Flex<'a, DioPin>,
    }

    impl<'a, StrobePin: gpio::Pin, ClockPin: gpio::Pin, DioPin: gpio::Pin>
        EmbassyRpPins<'a, StrobePin, ClockPin, DioPin>
    {
        pub fn new(strobe: StrobePin, clock: ClockPin, dio: DioPin) -> Self {
            Self {
                strobe: Flex::new(strobe),
                clock: Flex::new(clock),
                dio: Flex::new(dio),
            }
        }
    }

    fn level(state: PinState) -> Level {
        match state {
            PinState::Low => Level::Low,
            PinState::High => Level::High,
        }
    }

    impl<'a, StrobePin: gpio::Pin, ClockPin: gpio::Pin, DioPin: gpio::Pin> super::Pins
        for EmbassyRpPins<'a, StrobePin, ClockPin, DioPin>
    {
        type Error = Infallible;

        fn init(&mut self) -> Result<(), Self::Error> {
            // Set the output latches before enabling the drivers so there is no glitch on STB
            self.strobe.set_high();
            self.dio.set_low();
            self.clock.set_low();

            self.dio.set_as_output();
            self.clock.set_as_output();
            self.strobe.set_as_output();

            Ok(())
        }

        fn set_clock(&mut self, state: PinState) -> Result<(), Self::Error> {
            self.clock.set_level(level(state));
            Ok(())
        }

        fn set_strobe(&mut self, state: PinState) -> Result<(), Self::Error> {
            self.strobe.set_level(level(state));
            Ok(())
        }

        fn set_data(&mut self, state: PinState) -> Result<(), Self::Error> {
            self.dio.set_level(level(state));
            Ok(())
        }

        fn read_data(&mut self) -> Result<PinState, Self::Error> {
            Ok(PinState::from(self.dio.is_high()))
        }

        fn data_as_input(&mut self) -> Result<(), Self::Error> {
            self.dio.set_as_input();
            Ok(())
        }

        fn data_as_output(&mut self) -> Result<(), Self::Error> {
            self.dio.set_as_output();
            Ok(())
        }

        fn release(&mut self) -> Result<(), Self::Error> {
            self.dio.set_as_input();
            self.clock.set_as_input();
            self.strobe.set_as_input();

            self.dio.set_low();
            self.clock.set_low();
            self.strobe.set_low();

            Ok(())
        }
    }
}

#[cfg(feature = "embassy-rp")]
pub use embassy_rp_pins::EmbassyRpPins;
