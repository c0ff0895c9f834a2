use std::fmt;

use serde::{Deserialize, Serialize};
use troupe_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

pub type MessageIndex = u16;
pub type SlotIndex = u16;
pub type FieldId = u16;

/// Identifies one participant of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(u16);

impl PeerId {
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

impl Serde for PeerId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<5>::new(self.0).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let value = UnsignedVariableInteger::<5>::de(reader)?.get();
        let value = u16::try_from(value).map_err(|_| SerdeErr::IntegerOverflow)?;
        Ok(Self(value))
    }
}

/// Session-wide identifier of an actor's replication channel. Allocated by
/// the creating peer from its own counter, so handles never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReplicationHandle {
    creator: PeerId,
    index: u32,
}

impl ReplicationHandle {
    pub fn new(creator: PeerId, index: u32) -> Self {
        Self { creator, index }
    }

    pub fn creator(&self) -> PeerId {
        self.creator
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for ReplicationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.creator.value(), self.index)
    }
}

impl Serde for ReplicationHandle {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.creator.ser(writer);
        UnsignedVariableInteger::<7>::new(self.index).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let creator = PeerId::de(reader)?;
        let index = UnsignedVariableInteger::<7>::de(reader)?.get();
        let index = u32::try_from(index).map_err(|_| SerdeErr::IntegerOverflow)?;
        Ok(Self { creator, index })
    }
}

/// Why a peer asks for ownership. Collision requests are low priority and
/// may be refused where a default request would be granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnRequestReason {
    Default,
    Collision,
}

impl OwnRequestReason {
    pub fn code(&self) -> u8 {
        match self {
            OwnRequestReason::Default => 0,
            OwnRequestReason::Collision => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(OwnRequestReason::Default),
            1 => Some(OwnRequestReason::Collision),
            _ => None,
        }
    }
}

impl Serde for OwnRequestReason {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.code().ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let code = u8::de(reader)?;
        Self::from_code(code).ok_or(SerdeErr::UnknownTag {
            type_name: "OwnRequestReason",
            tag: u64::from(code),
        })
    }
}
