use thiserror::Error;

/// Errors that can occur while reading a bit stream back into values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The reader ran out of bits before the value was complete
    #[error("Unexpected end of buffer: needed more bits after reading {bits_read} of {buffer_bits}")]
    UnexpectedEnd { bits_read: u32, buffer_bits: u32 },

    /// A length-prefixed string did not contain valid UTF-8
    #[error("String payload of {byte_length} bytes is not valid UTF-8")]
    InvalidUtf8 { byte_length: usize },

    /// An enum tag did not match any known variant
    #[error("Unknown tag {tag} while reading {type_name}")]
    UnknownTag { type_name: &'static str, tag: u64 },

    /// A variable length integer did not fit in 64 bits
    #[error("Variable length integer exceeded 64 bits")]
    IntegerOverflow,

    /// A collection length was larger than the remaining buffer could hold
    #[error("Collection length {length} exceeds remaining buffer")]
    LengthOutOfRange { length: u64 },
}
