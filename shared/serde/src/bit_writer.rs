/// Sink for individual bits. Implemented by [`BitWriter`], which produces
/// bytes, and by [`crate::BitCounter`], which only measures.
pub trait BitWrite {
    fn write_bit(&mut self, bit: bool);
    fn write_byte(&mut self, byte: u8);
    fn is_counter(&self) -> bool;
    fn count_bits(&mut self, bits: u32);
}

/// Growable bit writer. Bits are packed least significant first, so the
/// first bit written becomes bit 0 of the first byte.
pub struct BitWriter {
    scratch: u8,
    scratch_index: u8,
    buffer: Vec<u8>,
    bits_written: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            scratch: 0,
            scratch_index: 0,
            buffer: Vec::with_capacity(64),
            bits_written: 0,
        }
    }

    fn flush_scratch(&mut self) {
        if self.scratch_index > 0 {
            let byte = (self.scratch << (8 - self.scratch_index)).reverse_bits();
            self.buffer.push(byte);
            self.scratch = 0;
            self.scratch_index = 0;
        }
    }

    pub fn to_bytes(mut self) -> Vec<u8> {
        self.flush_scratch();
        self.buffer
    }

    pub fn bits_written(&self) -> u32 {
        self.bits_written
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for BitWriter {
    fn write_bit(&mut self, bit: bool) {
        self.scratch <<= 1;

        if bit {
            self.scratch |= 1;
        }

        self.scratch_index += 1;
        self.bits_written += 1;

        if self.scratch_index >= 8 {
            self.buffer.push(self.scratch.reverse_bits());
            self.scratch_index = 0;
            self.scratch = 0;
        }
    }

    fn write_byte(&mut self, byte: u8) {
        let mut temp = byte;
        for _ in 0..8 {
            self.write_bit(temp & 1 != 0);
            temp >>= 1;
        }
    }

    fn is_counter(&self) -> bool {
        false
    }

    fn count_bits(&mut self, _bits: u32) {}
}
