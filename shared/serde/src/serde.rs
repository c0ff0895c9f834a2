use crate::{BitCounter, BitReader, BitWrite, SerdeErr};

/// A type that can be written to and read from a bit stream.
pub trait Serde: Sized {
    /// Writes the value into the bit stream
    fn ser(&self, writer: &mut dyn BitWrite);

    /// Parses a value from the bit stream
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    /// Number of bits this value occupies once written
    fn bit_length(&self) -> u32 {
        let mut counter = BitCounter::new();
        self.ser(&mut counter);
        counter.bits_needed()
    }
}

/// Types whose encoded size never depends on their value
pub trait ConstBitLength {
    fn const_bit_length() -> u32;
}
