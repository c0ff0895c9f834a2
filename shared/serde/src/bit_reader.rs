use crate::SerdeErr;

/// Reads bits back out of a buffer produced by [`crate::BitWriter`].
pub struct BitReader<'b> {
    buffer: &'b [u8],
    bits_read: u32,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            bits_read: 0,
        }
    }

    pub fn bits_read(&self) -> u32 {
        self.bits_read
    }

    pub fn bits_remaining(&self) -> u32 {
        self.buffer_bits().saturating_sub(self.bits_read)
    }

    fn buffer_bits(&self) -> u32 {
        u32::try_from(self.buffer.len())
            .unwrap_or(u32::MAX / 8)
            .saturating_mul(8)
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        let byte_index = (self.bits_read / 8) as usize;
        let Some(byte) = self.buffer.get(byte_index) else {
            return Err(SerdeErr::UnexpectedEnd {
                bits_read: self.bits_read,
                buffer_bits: self.buffer_bits(),
            });
        };
        let bit = (byte >> (self.bits_read % 8)) & 1 != 0;
        self.bits_read += 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let mut output: u8 = 0;
        for index in 0..8 {
            if self.read_bit()? {
                output |= 1u8 << index;
            }
        }
        Ok(output)
    }
}
