use thiserror::Error;
use troupe_serde::SerdeErr;

use crate::types::MessageIndex;

/// Errors that can occur while arranging inbound sequenced calls
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiverError {
    /// The index was already delivered or is already buffered
    #[error("Duplicate message index {index}")]
    DuplicateMessage { index: MessageIndex },

    /// The index is too far ahead of the next expected index to buffer
    #[error("Message index {index} is {distance} ahead of the next expected index, beyond the window of {window}")]
    OutOfWindow {
        index: MessageIndex,
        distance: u16,
        window: u16,
    },

    /// Buffer inconsistency detected in the ordered receiver
    #[error("Buffer inconsistency detected: {reason}. This indicates an internal ordering error")]
    BufferInconsistency { reason: &'static str },
}

/// Errors raised while decoding raw transport payloads
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload could not be decoded into an envelope
    #[error("Malformed envelope of {length} bytes: {source}")]
    MalformedEnvelope {
        length: usize,
        #[source]
        source: SerdeErr,
    },
}
