use thiserror::Error;

use crate::{
    actor::value::ValueKind,
    types::{FieldId, SlotIndex},
};

/// Errors raised by field access, whether by ID from the scripting boundary
/// or by name from save files and tooling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// No field is registered under this ID
    #[error("Unknown field ID {field_id}")]
    UnknownField { field_id: FieldId },

    /// No field is registered under this name
    #[error("Unknown field name '{name}'")]
    UnknownFieldName { name: String },

    /// The field exists but holds a different kind of value
    #[error("Field '{field}' holds a {expected} value, got {actual}")]
    KindMismatch {
        field: &'static str,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// NaN and infinite components are refused
    #[error("Field '{field}' cannot hold a non-finite value")]
    NonFinite { field: &'static str },

    /// No actor goes by this name
    #[error("Unknown actor '{name}'")]
    UnknownActor { name: String },

    /// The slot index is not part of the current tick's snapshot
    #[error("Slot {slot} is out of range for a snapshot of {slot_count} actors")]
    SlotOutOfRange { slot: SlotIndex, slot_count: usize },

    /// The slot referred to an actor that has since been destroyed
    #[error("Slot {slot} refers to an actor that no longer exists")]
    StaleSlot { slot: SlotIndex },

    /// Writes are only accepted on the owning peer
    #[error("Actor '{actor}' is not locally owned; field '{field}' was not written")]
    NotLocallyOwned { actor: String, field: &'static str },

    /// A reparent was refused because it would create a cycle or exceed the
    /// hierarchy depth bound
    #[error("Reparenting '{actor}' under '{parent}' was rejected: {reason}")]
    ReparentRejected {
        actor: String,
        parent: String,
        reason: &'static str,
    },
}
