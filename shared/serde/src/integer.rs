use crate::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr};

/// Unsigned integer written with exactly `BITS` bits.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct UnsignedInteger<const BITS: u8> {
    value: u64,
}

/// Unsigned integer written in `BITS`-sized chunks, each preceded by a
/// continuation bit. Small values stay small on the wire.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct UnsignedVariableInteger<const BITS: u8> {
    value: u64,
}

fn write_chunk(writer: &mut dyn BitWrite, value: u64, bits: u8) {
    for index in 0..bits {
        writer.write_bit((value >> index) & 1 != 0);
    }
}

fn read_chunk(reader: &mut BitReader, bits: u8) -> Result<u64, SerdeErr> {
    let mut output: u64 = 0;
    for index in 0..bits {
        if reader.read_bit()? {
            output |= 1u64 << index;
        }
    }
    Ok(output)
}

impl<const BITS: u8> UnsignedInteger<BITS> {
    /// Creates a new fixed-width integer.
    ///
    /// # Panics
    ///
    /// Panics if `value` does not fit in `BITS` bits.
    pub fn new<T: Into<u64>>(value: T) -> Self {
        Self::try_new(value).unwrap_or_else(|| panic!("value does not fit in {} bits", BITS))
    }

    pub fn try_new<T: Into<u64>>(value: T) -> Option<Self> {
        let value = value.into();
        if BITS < 64 && value >> BITS != 0 {
            return None;
        }
        Some(Self { value })
    }

    pub fn get(&self) -> u64 {
        self.value
    }
}

impl<const BITS: u8> Serde for UnsignedInteger<BITS> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        write_chunk(writer, self.value, BITS);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            value: read_chunk(reader, BITS)?,
        })
    }

    fn bit_length(&self) -> u32 {
        u32::from(BITS)
    }
}

impl<const BITS: u8> ConstBitLength for UnsignedInteger<BITS> {
    fn const_bit_length() -> u32 {
        u32::from(BITS)
    }
}

impl<const BITS: u8> UnsignedVariableInteger<BITS> {
    pub fn new<T: Into<u64>>(value: T) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn get(&self) -> u64 {
        self.value
    }
}

impl<const BITS: u8> Serde for UnsignedVariableInteger<BITS> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let mask = if BITS >= 64 { u64::MAX } else { (1u64 << BITS) - 1 };
        let mut remaining = self.value;
        loop {
            let chunk = remaining & mask;
            remaining = if BITS >= 64 { 0 } else { remaining >> BITS };
            writer.write_bit(remaining != 0);
            write_chunk(writer, chunk, BITS);
            if remaining == 0 {
                break;
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let mut value: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let proceed = reader.read_bit()?;
            let chunk = read_chunk(reader, BITS)?;
            if shift >= 64 || (shift > 0 && chunk.checked_shl(shift).map(|c| c >> shift) != Some(chunk)) {
                return Err(SerdeErr::IntegerOverflow);
            }
            value |= chunk << shift;
            shift += u32::from(BITS);
            if !proceed {
                return Ok(Self { value });
            }
        }
    }
}

impl<const BITS: u8> From<UnsignedVariableInteger<BITS>> for u64 {
    fn from(value: UnsignedVariableInteger<BITS>) -> Self {
        value.value
    }
}
