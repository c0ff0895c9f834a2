use crate::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr, UnsignedVariableInteger};

impl Serde for bool {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_bit()
    }
}

impl ConstBitLength for bool {
    fn const_bit_length() -> u32 {
        1
    }
}

impl Serde for u8 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_byte(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_byte()
    }
}

macro_rules! impl_serde_for_le_bytes {
    ($($ty:ty),*) => {
        $(
            impl Serde for $ty {
                fn ser(&self, writer: &mut dyn BitWrite) {
                    for byte in self.to_le_bytes() {
                        writer.write_byte(byte);
                    }
                }

                fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                    let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                    for byte in bytes.iter_mut() {
                        *byte = reader.read_byte()?;
                    }
                    Ok(<$ty>::from_le_bytes(bytes))
                }
            }

            impl ConstBitLength for $ty {
                fn const_bit_length() -> u32 {
                    (std::mem::size_of::<$ty>() * 8) as u32
                }
            }
        )*
    };
}

impl_serde_for_le_bytes!(u16, u32, u64, i32, f32);

fn read_length(reader: &mut BitReader) -> Result<usize, SerdeErr> {
    let length = UnsignedVariableInteger::<7>::de(reader)?.get();
    // every element takes at least one bit
    if length > u64::from(reader.bits_remaining()) {
        return Err(SerdeErr::LengthOutOfRange { length });
    }
    usize::try_from(length).map_err(|_| SerdeErr::LengthOutOfRange { length })
}

impl Serde for String {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<7>::new(self.len() as u64).ser(writer);
        for byte in self.as_bytes() {
            writer.write_byte(*byte);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = read_length(reader)?;
        let mut bytes = Vec::with_capacity(length);
        for _ in 0..length {
            bytes.push(reader.read_byte()?);
        }
        String::from_utf8(bytes).map_err(|_| SerdeErr::InvalidUtf8 {
            byte_length: length,
        })
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<7>::new(self.len() as u64).ser(writer);
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length = read_length(reader)?;
        let mut output = Vec::with_capacity(length);
        for _ in 0..length {
            output.push(T::de(reader)?);
        }
        Ok(output)
    }
}

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Some(value) => {
                writer.write_bit(true);
                value.ser(writer);
            }
            None => writer.write_bit(false),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }
}
