use core::fmt;

/// Errors returned by [`crate::Tm1638`] operations.
///
/// `E` is the error type of the underlying [`crate::BusDriver`].  The TM1638 has no
/// acknowledgement or checksum, so the only errors besides the bus driver's own are requests the
/// driver refuses to put on the bus at all.  Those are only reported in
/// [`crate::ValidationMode::Strict`]; in [`crate::ValidationMode::Lenient`] they are dropped and
/// the operation returns `Ok(())`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The bus driver failed
    Bus(E),

    /// The write would touch registers outside of `0x00..=0x0F`
    InvalidAddress { address: u8, len: usize },

    /// Brightness above [`crate::MAX_BRIGHTNESS`]
    InvalidBrightness(u8),
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {e:?}"),
            Error::InvalidAddress { address, len } => write!(
                f,
                "cannot write {len} byte(s) at display register {address:#04x}"
            ),
            Error::InvalidBrightness(brightness) => {
                write!(f, "brightness {brightness} is out of range 0..=7")
            }
        }
    }
}

/// Errors from the [`crate::BitBangingBusDriver`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<E> {
    /// A pin operation failed
    Pin(E),

    /// Attempted to drive DIO while it is switched to input for a read
    DataLineNotOutput,
}

impl<E> From<E> for BusError<E> {
    fn from(e: E) -> Self {
        BusError::Pin(e)
    }
}

impl<E: fmt::Debug> fmt::Display for BusError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::Pin(e) => write!(f, "pin error: {e:?}"),
            BusError::DataLineNotOutput => f.write_str("DIO is not configured as an output"),
        }
    }
}
