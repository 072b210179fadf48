/// The number of bytes used to represent the state of the keys on the board
pub const KEY_BYTES: usize = 4;

/// Bits of each key scan byte that carry key state; bits 3 and 7 are always zero on a healthy
/// chip (datasheet section 8)
const USED_BITS: u32 = 0x7777_7777;

/// The state of the keys, as returned by [`crate::Tm1638::read_keys`].
///
/// The four key scan bytes are packed into one 32-bit mask, the first byte received in the least
/// significant 8 bits (`byte[i] << (8 * i)`).  Each byte holds two rows of the 3x8 matrix: the odd
/// row (KS1, KS3, ..) in the low nibble and the even row in the high nibble.
///
/// Once you have an instance of this struct you can:
///
/// - use [`Self::bits`] (or `u32::from`) to get the raw mask;
/// - use [`Self::is_pressed`] to test a specific key;
/// - use [`Self::any_pressed`] to find out if anything at all is pressed;
/// - use [`Self::iter`] to walk over every pressed key.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Keys(u32);

impl Keys {
    /// Assemble the key state from the four key scan bytes, in the order they came off the bus
    pub fn from_scan_bytes(bytes: [u8; KEY_BYTES]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw 32-bit key scan mask
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Quickly check if *any* keys are pressed
    pub fn any_pressed(&self) -> bool {
        self.0 & USED_BITS != 0
    }

    /// Test if the given key (identified by its column and row) is pressed
    pub fn is_pressed(&self, col: KeyColumn, row: KeyRow) -> bool {
        self.0 & key_bit(col, row) != 0
    }

    /// Compress the key state into a single 8-bit mask with one bit set if any key in the
    /// corresponding row is pressed.  [`KeyRow::KS1`] maps to bit 0, [`KeyRow::KS2`] to bit 1, etc.
    ///
    /// Boards with only 8 switches usually wire one switch per row, in which case this is the state
    /// of those switches.
    pub fn rows_bitmask(&self) -> u8 {
        use strum::VariantArray;

        KeyRow::VARIANTS
            .iter()
            .filter(|row| self.0 & row.mask() != 0)
            .fold(0u8, |bitmask, row| bitmask | (1 << row.index()))
    }

    /// Iterate over the pressed keys, in ascending bit order.  The key state itself is left as is.
    pub fn iter(&self) -> PressedKeys {
        PressedKeys {
            remaining: self.0 & USED_BITS,
        }
    }
}

impl IntoIterator for &Keys {
    type Item = (KeyColumn, KeyRow);
    type IntoIter = PressedKeys;

    fn into_iter(self) -> PressedKeys {
        self.iter()
    }
}

/// Iterator over the pressed keys of a [`Keys`], returned by [`Keys::iter`]
#[derive(Clone, Debug)]
pub struct PressedKeys {
    remaining: u32,
}

impl Iterator for PressedKeys {
    type Item = (KeyColumn, KeyRow);

    /// Take the lowest pressed key and clear it from the remaining set
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let bit = self.remaining.trailing_zeros();
        self.remaining &= !(1 << bit);

        let row = KeyRow::from_index((bit / 4) as u8)?;
        let col = KeyColumn::from_bit_index((bit % 4) as u8)?;

        Some((col, row))
    }
}

impl From<Keys> for u32 {
    fn from(keys: Keys) -> Self {
        keys.0
    }
}

fn key_bit(col: KeyColumn, row: KeyRow) -> u32 {
    (col.nibble_mask() as u32) << (4 * row.index())
}

/// The columns in the keyboard matrix that the TM1638 scans
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::VariantArray)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyColumn {
    K1,
    K2,
    K3,
}

impl KeyColumn {
    pub fn to_column_number(self) -> u8 {
        match self {
            Self::K1 => 1,
            Self::K2 => 2,
            Self::K3 => 3,
        }
    }

    fn nibble_mask(&self) -> u8 {
        // Column K3 is in bit 0, K2 in bit 1, K1 in bit 2, and bit 3 is unused
        match self {
            Self::K1 => 0b0100,
            Self::K2 => 0b0010,
            Self::K3 => 0b0001,
        }
    }

    /// Construct a column from the (0-based) index of a bit inside a row's nibble.
    fn from_bit_index(bit: u8) -> Option<Self> {
        match bit {
            0 => Some(Self::K3),
            1 => Some(Self::K2),
            2 => Some(Self::K1),
            _ => None,
        }
    }
}

/// The rows in the keyboard matrix that the TM1638 scans
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::VariantArray)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyRow {
    KS1,
    KS2,
    KS3,
    KS4,
    KS5,
    KS6,
    KS7,
    KS8,
}

impl KeyRow {
    pub fn to_row_number(self) -> u8 {
        self.index() + 1
    }

    /// 0-based row index, which is also the index of the row's nibble in the 32-bit mask
    fn index(&self) -> u8 {
        match self {
            Self::KS1 => 0,
            Self::KS2 => 1,
            Self::KS3 => 2,
            Self::KS4 => 3,
            Self::KS5 => 4,
            Self::KS6 => 5,
            Self::KS7 => 6,
            Self::KS8 => 7,
        }
    }

    fn from_index(index: u8) -> Option<Self> {
        use strum::VariantArray;

        Self::VARIANTS.get(index as usize).copied()
    }

    /// All key bits of this row
    fn mask(&self) -> u32 {
        0b0111 << (4 * self.index())
    }
}
