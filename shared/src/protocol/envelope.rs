use troupe_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr};

use crate::{
    protocol::{error::ProtocolError, rpc::Rpc},
    types::MessageIndex,
};

/// Unit exchanged over the raw transport
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// A sequenced call. Must be acked by the receiver.
    Data { index: MessageIndex, rpc: Rpc },
    /// Acknowledges receipt of the data envelope with this index
    Ack { index: MessageIndex },
}

impl Envelope {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        self.ser(&mut writer);
        writer.to_bytes()
    }

    /// Encodes a data envelope without taking ownership of the call
    pub fn data_bytes(index: MessageIndex, rpc: &Rpc) -> Vec<u8> {
        let mut writer = BitWriter::new();
        writer.write_bit(false);
        index.ser(&mut writer);
        rpc.ser(&mut writer);
        writer.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = BitReader::new(bytes);
        Self::de(&mut reader).map_err(|source| ProtocolError::MalformedEnvelope {
            length: bytes.len(),
            source,
        })
    }
}

impl Serde for Envelope {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Envelope::Data { index, rpc } => {
                writer.write_bit(false);
                index.ser(writer);
                rpc.ser(writer);
            }
            Envelope::Ack { index } => {
                writer.write_bit(true);
                index.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Envelope::Ack {
                index: Serde::de(reader)?,
            })
        } else {
            Ok(Envelope::Data {
                index: Serde::de(reader)?,
                rpc: Serde::de(reader)?,
            })
        }
    }
}
