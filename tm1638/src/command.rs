//! Encoding of the TM1638 instruction set into command bytes.
//!
//! Bits 7 and 6 of every command byte select the instruction class:
//!
//! ```text
//!  7 6 5 4 3 2 1 0
//!  0 1 0 0 0 F R 0   data command (F = fixed address, R = read key scan data)
//!  1 0 0 0 D B B B   display control (D = display on, BBB = brightness)
//!  1 1 0 0 A A A A   address command
//! ```

/// Number of display registers in the chip, addressed `0x00..=0x0F`
pub const DISPLAY_REGISTERS: usize = 16;

/// Highest brightness level accepted by the display control command
pub const MAX_BRIGHTNESS: u8 = 7;

const DATA_COMMAND: u8 = 0b0100_0000;
const DATA_FIXED_ADDRESS: u8 = 0b0000_0100;
const DATA_READ_KEYS: u8 = 0b0000_0010;

const DISPLAY_CONTROL_COMMAND: u8 = 0b1000_0000;
const DISPLAY_CONTROL_ON: u8 = 0b0000_1000;
const BRIGHTNESS_MASK: u8 = 0b0000_0111;

const ADDRESS_COMMAND: u8 = 0b1100_0000;
const ADDRESS_MASK: u8 = 0b0000_1111;

/// Write-only instructions understood by the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum WriteCommand<'a> {
    /// Program the display control register.  The brightness is the pulse width setting, 0 being
    /// 1/16 and 7 being 14/16.
    DisplayControl { on: bool, brightness: u8 },

    /// Subsequent data bytes go to consecutive registers.
    SetIncrementalAddressing,

    /// Subsequent data bytes all go to the addressed register.
    SetFixedAddressing,

    /// Set the register address and write one or more data bytes in the same strobe window.
    ///
    /// More than one byte only makes sense in incremental addressing mode.
    WriteRegisters { address: u8, data: &'a [u8] },
}

impl<'a> WriteCommand<'a> {
    /// Convert this command into the command byte and the (optional) data bytes which must follow
    /// it before strobe is released.
    pub(crate) fn encode<'me>(&'me self) -> (u8, Option<&'me [u8]>)
    where
        'a: 'me,
    {
        match self {
            WriteCommand::DisplayControl { on, brightness } => {
                let on = if *on { DISPLAY_CONTROL_ON } else { 0 };

                (
                    DISPLAY_CONTROL_COMMAND | on | (brightness & BRIGHTNESS_MASK),
                    None,
                )
            }
            WriteCommand::SetIncrementalAddressing => (DATA_COMMAND, None),
            WriteCommand::SetFixedAddressing => (DATA_COMMAND | DATA_FIXED_ADDRESS, None),
            WriteCommand::WriteRegisters { address, data } => {
                (ADDRESS_COMMAND | (address & ADDRESS_MASK), Some(data))
            }
        }
    }
}

/// Instructions which make the controller send data back on DIO.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ReadCommand {
    /// Read the four key scan bytes
    ReadKeys,
}

impl ReadCommand {
    /// Command byte, and the number of bytes the controller answers with inside the same strobe
    /// window.
    pub(crate) fn encode(&self) -> (u8, usize) {
        match self {
            ReadCommand::ReadKeys => (DATA_COMMAND | DATA_READ_KEYS, crate::keys::KEY_BYTES),
        }
    }
}

/// Check that `len` bytes starting at register `address` fit in the register file.
pub(crate) fn registers_in_range(address: u8, len: usize) -> bool {
    (address as usize) < DISPLAY_REGISTERS && len <= DISPLAY_REGISTERS - address as usize
}
