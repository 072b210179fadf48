#![no_std]

mod bus;
mod command;
mod error;
mod keys;
pub mod pins;

use embedded_hal_1::delay::DelayNs;

pub use bus::*;
pub use command::{DISPLAY_REGISTERS, MAX_BRIGHTNESS};
pub use error::*;
pub use keys::*;

use command::{ReadCommand, WriteCommand};

const BLANK_DISPLAY_STATE: &[u8; DISPLAY_REGISTERS] = &[0x00; DISPLAY_REGISTERS];

/// What to do with requests the chip can't carry out: register writes outside of `0x00..=0x0F`
/// and brightness levels above [`MAX_BRIGHTNESS`].
///
/// In both modes nothing is sent to the controller and the driver state is left unchanged.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidationMode {
    /// Report the request as an [`Error`]
    #[default]
    Strict,

    /// Silently drop the request and return `Ok(())`, like most Arduino TM1638 libraries do
    Lenient,
}

/// Runtime configuration of a [`Tm1638`] driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Whether [`Tm1638::init`] turns the display on
    pub display_on: bool,

    /// Brightness from 0 (lowest) to 7 (highest)
    pub brightness: u8,

    /// Bus timing of the bit-banging driver; ignored by [`Tm1638Builder::with_bus_driver`]
    pub timing: Timing,

    /// How requests the chip can't carry out are handled
    pub validation: ValidationMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_on: true,
            brightness: 0x02,
            timing: Timing::default(),
            validation: ValidationMode::default(),
        }
    }
}

pub struct Tm1638Builder {
    config: Config,
}

impl Tm1638Builder {
    /// Replace the whole configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Whether [`Tm1638::init`] turns the display on
    pub fn display_on(mut self, display_on: bool) -> Self {
        self.config.display_on = display_on;
        self
    }

    /// Initial brightness, 0 to [`MAX_BRIGHTNESS`]
    pub fn brightness(mut self, brightness: u8) -> Self {
        self.config.brightness = brightness;
        self
    }

    /// Bus timing for the bit-banging driver
    pub fn timing(mut self, timing: Timing) -> Self {
        self.config.timing = timing;
        self
    }

    /// Strict or lenient handling of out-of-range requests
    pub fn validation(mut self, validation: ValidationMode) -> Self {
        self.config.validation = validation;
        self
    }

    /// Use an arbitrary [`BusDriver`] implementation; nothing more needs to be specified!
    pub fn with_bus_driver<D: BusDriver>(self, driver: D) -> Tm1638Builder3<D> {
        Tm1638Builder3 {
            config: self.config,
            driver,
        }
    }

    /// Use an arbitrary [`DelayNs`] implementation with the bit-banging driver.
    pub fn with_delay<D: DelayNs>(self, delay: D) -> Tm1638Builder1<D> {
        Tm1638Builder1 {
            config: self.config,
            delay,
        }
    }

    /// Bit-bang without waiting between pin changes; see [`NoDelay`]
    pub fn without_delay(self) -> Tm1638Builder1<NoDelay> {
        self.with_delay(NoDelay)
    }

    #[cfg(feature = "embassy-time")]
    /// Use the blocking delay built using `embassy-time`
    pub fn with_embassy_delay(self) -> Tm1638Builder1<embassy_time::Delay> {
        self.with_delay(embassy_time::Delay)
    }
}

pub struct Tm1638Builder1<D: DelayNs> {
    config: Config,
    delay: D,
}

impl<D: DelayNs> Tm1638Builder1<D> {
    /// Use the bit-banging driver, with an arbitrary implementation of [`Pins`] specific to your
    /// target platform
    pub fn with_bit_banging_driver<P: Pins>(self, pins: P) -> Tm1638Builder2<P, D> {
        Tm1638Builder2 {
            config: self.config,
            delay: self.delay,
            pins,
        }
    }

    /// Use the bit-banging driver over Embedded HAL pins; see [`pins::OpenDrainPins`]
    pub fn with_open_drain_pins<Clk, Dio, Stb>(
        self,
        clock: Clk,
        dio: Dio,
        strobe: Stb,
    ) -> Tm1638Builder2<pins::OpenDrainPins<Clk, Dio, Stb>, D>
    where
        pins::OpenDrainPins<Clk, Dio, Stb>: Pins,
    {
        self.with_bit_banging_driver(pins::OpenDrainPins::new(clock, dio, strobe))
    }

    /// Use a bit-banging driver talking to the specified Embassy RP HAL pins
    #[cfg(feature = "embassy-rp")]
    pub fn with_embassy_rp_pins<
        'a,
        StrobePin: embassy_rp::gpio::Pin,
        ClockPin: embassy_rp::gpio::Pin,
        DioPin: embassy_rp::gpio::Pin,
    >(
        self,
        strobe: StrobePin,
        clock: ClockPin,
        dio: DioPin,
    ) -> Tm1638Builder2<pins::EmbassyRpPins<'a, StrobePin, ClockPin, DioPin>, D> {
        self.with_bit_banging_driver(pins::EmbassyRpPins::new(strobe, clock, dio))
    }
}

pub struct Tm1638Builder2<P: Pins, D: DelayNs> {
    config: Config,
    delay: D,
    pins: P,
}

impl<P: Pins, D: DelayNs> Tm1638Builder2<P, D> {
    /// Construct the [`Tm1638`] instance using the bit-banging driver.
    ///
    /// This is fallible if the underling I/O implementation is, or if the configured brightness
    /// is out of range in [`ValidationMode::Strict`].
    #[allow(clippy::type_complexity)]
    pub fn build(self) -> Result<Tm1638<BitBangingBusDriver<P, D>>, Error<BusError<P::Error>>> {
        let driver = BitBangingBusDriver::new(self.pins, self.delay, self.config.timing)
            .map_err(|e| Error::Bus(BusError::Pin(e)))?;

        Tm1638::new(driver, self.config)
    }
}

pub struct Tm1638Builder3<D: BusDriver> {
    config: Config,
    driver: D,
}

impl<D: BusDriver> Tm1638Builder3<D> {
    /// Construct the [`Tm1638`] instance using the selected driver.
    pub fn build(self) -> Result<Tm1638<D>, Error<D::Error>> {
        Tm1638::new(self.driver, self.config)
    }
}

/// Driver for TM1638 display and switch controllers.
///
/// The implementation is generalized over the implementation of the underling bus protocol driver,
/// behind the [`BusDriver`] trait.  This allows most of the code to remain the same, while
/// supporting multiple hardware HALs and timer implementations.
///
/// The driver remembers only whether the display is on and its brightness; display registers are
/// written straight through and never cached.  Every operation blocks until its transaction is
/// complete.  There is no locking: share a driver between tasks only behind a mutex.
///
/// The most straightforward way to instantiate this driver is using [`Self::builder`] which
/// returns a builder type with which you can get easy access to the built-in implementations.
///
/// For example, to use the `embassy-time` delay and the `embassy-rp` HAL for RP2040:
///
/// ```
/// # #[cfg(all(feature = "embassy-time", feature = "embassy-rp"))]
/// # {
/// let p = embassy_rp::init(Default::default());
/// let mut driver = tm1638::Tm1638::builder()
///     .brightness(5)
///     .with_embassy_delay()
///     .with_embassy_rp_pins(p.PIN_6, p.PIN_7, p.PIN_8)
///     .build()
///     .unwrap();
/// driver.init().unwrap();
/// # }
/// ```
pub struct Tm1638<Driver> {
    driver: Driver,
    display_enabled: bool,
    brightness: u8,
    validation: ValidationMode,
}

impl Tm1638<()> {
    /// Return a builder pattern implementation to ease some of the type parameter complexity
    /// around creating the bus driver and delay.
    ///
    /// This is not required; you can always instantiate the driver without a builder, but you
    /// might have to type more angle brackets to do so.
    pub fn builder() -> Tm1638Builder {
        Tm1638Builder {
            config: Config::default(),
        }
    }
}

impl<Driver: BusDriver> Tm1638<Driver> {
    /// Wrap a bus driver.  Nothing is sent to the controller until [`Self::init`].
    ///
    /// An out of range `config.brightness` is an error in [`ValidationMode::Strict`], and is
    /// truncated to its lowest 3 bits in [`ValidationMode::Lenient`].
    pub fn new(driver: Driver, config: Config) -> Result<Self, Error<Driver::Error>> {
        let brightness = match config.validation {
            ValidationMode::Strict if config.brightness > MAX_BRIGHTNESS => {
                return Err(Error::InvalidBrightness(config.brightness));
            }
            _ => config.brightness & MAX_BRIGHTNESS,
        };

        Ok(Self {
            driver,
            display_enabled: config.display_on,
            brightness,
            validation: config.validation,
        })
    }

    /// Reset the TM1638 state: blank all of the LEDs, then program the display control register
    /// with the configured on/off state and brightness.
    pub fn init(&mut self) -> Result<(), Error<Driver::Error>> {
        self.clear()?;
        self.write_display_control()
    }

    /// Release the bus pins and give back the bus driver
    pub fn shutdown(mut self) -> Result<Driver, Error<Driver::Error>> {
        self.driver.release().map_err(Error::Bus)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("bus released");

        Ok(self.driver)
    }

    pub fn is_display_on(&self) -> bool {
        self.display_enabled
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn validation(&self) -> ValidationMode {
        self.validation
    }

    /// Turn the display on, at the current brightness
    pub fn display_on(&mut self) -> Result<(), Error<Driver::Error>> {
        self.display_enabled = true;
        self.write_display_control()
    }

    /// Turn the display off.  The display registers and the brightness are kept.
    pub fn display_off(&mut self) -> Result<(), Error<Driver::Error>> {
        self.display_enabled = false;
        self.write_display_control()
    }

    /// Set the brightness, from 0 (lowest brightness, 1/16 pulse width) to 7 (highest
    /// brightness, 14/16 pulse width).
    ///
    /// The display control register is rewritten even while the display is off, so the new
    /// brightness applies as soon as it's turned back on.
    pub fn set_brightness(&mut self, brightness: u8) -> Result<(), Error<Driver::Error>> {
        if brightness > MAX_BRIGHTNESS {
            return self.reject(Error::InvalidBrightness(brightness));
        }

        self.brightness = brightness;

        #[cfg(feature = "defmt")]
        defmt::debug!("brightness = {=u8}", brightness);

        self.write_display_control()
    }

    /// Blank the display state, including all 7 seg displays and LEDs
    pub fn clear(&mut self) -> Result<(), Error<Driver::Error>> {
        self.apply_write_command(WriteCommand::SetIncrementalAddressing)?;

        self.apply_write_command(WriteCommand::WriteRegisters {
            address: 0,
            data: BLANK_DISPLAY_STATE,
        })
    }

    /// Set the display register at `address` (`0x00..=0x0F`) to `value`, using the fixed
    /// addressing mode of the TM1638.
    ///
    /// On the common boards even addresses drive the segments of the 7-segment digits (bit 7 is
    /// the `.`) and odd addresses drive the discrete LEDs.
    pub fn write_display_register(
        &mut self,
        address: u8,
        value: u8,
    ) -> Result<(), Error<Driver::Error>> {
        if !command::registers_in_range(address, 1) {
            return self.reject(Error::InvalidAddress { address, len: 1 });
        }

        self.apply_write_command(WriteCommand::SetFixedAddressing)?;

        self.apply_write_command(WriteCommand::WriteRegisters {
            address,
            data: core::slice::from_ref(&value),
        })
    }

    /// Write `data` to consecutive display registers starting at `address`, using the
    /// incremental addressing mode of the TM1638.  All of it must fit below register `0x10`.
    ///
    /// Writing an empty slice to a valid address sends nothing.
    pub fn write_display_buffer(
        &mut self,
        address: u8,
        data: &[u8],
    ) -> Result<(), Error<Driver::Error>> {
        if !command::registers_in_range(address, data.len()) {
            return self.reject(Error::InvalidAddress {
                address,
                len: data.len(),
            });
        }

        if data.is_empty() {
            return Ok(());
        }

        self.apply_write_command(WriteCommand::SetIncrementalAddressing)?;

        self.apply_write_command(WriteCommand::WriteRegisters { address, data })
    }

    /// Read the key scan data from the controller
    pub fn read_keys(&mut self) -> Result<Keys, Error<Driver::Error>> {
        let mut buffer = [0u8; KEY_BYTES];

        self.apply_read_command(ReadCommand::ReadKeys, &mut buffer)?;

        #[cfg(feature = "defmt")]
        defmt::trace!("keys = {:?}", buffer);

        Ok(Keys::from_scan_bytes(buffer))
    }

    fn write_display_control(&mut self) -> Result<(), Error<Driver::Error>> {
        self.apply_write_command(WriteCommand::DisplayControl {
            on: self.display_enabled,
            brightness: self.brightness,
        })
    }

    /// Refuse a request without touching the bus, as the validation mode says
    fn reject(&self, error: Error<Driver::Error>) -> Result<(), Error<Driver::Error>> {
        #[cfg(feature = "defmt")]
        match error {
            Error::InvalidAddress { address, len } => {
                defmt::warn!("ignoring write of {} byte(s) at {=u8:x}", len, address)
            }
            Error::InvalidBrightness(brightness) => {
                defmt::warn!("ignoring brightness {=u8}", brightness)
            }
            Error::Bus(_) => {}
        }

        match self.validation {
            ValidationMode::Strict => Err(error),
            ValidationMode::Lenient => Ok(()),
        }
    }

    /// Apply the command to the controller
    fn apply_write_command(
        &mut self,
        command: WriteCommand<'_>,
    ) -> Result<(), Error<Driver::Error>> {
        let (command_byte, data_bytes) = command.encode();

        #[cfg(feature = "defmt")]
        defmt::trace!("command byte = {=u8:x}", command_byte);

        let result = if let Some(data_bytes) = data_bytes {
            self.driver.send_command_write_data(command_byte, data_bytes)
        } else {
            self.driver.send_command(command_byte)
        };

        result.map_err(Error::Bus)
    }

    fn apply_read_command(
        &mut self,
        command: ReadCommand,
        read_buffer: &mut [u8],
    ) -> Result<(), Error<Driver::Error>> {
        let (command_byte, read_bytes) = command.encode();

        #[cfg(feature = "defmt")]
        defmt::trace!("command byte = {=u8:x}", command_byte);

        // Limit the read buffer to just the range needed to store these results
        let len = read_bytes.min(read_buffer.len());
        let read_buffer = &mut read_buffer[..len];

        self.driver
            .send_command_read_data(command_byte, read_buffer)
            .map_err(Error::Bus)
    }
}
