//! # Troupe Shared
//! Actor data model, persisted records and the replication protocol shared
//! by every troupe peer.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use troupe_serde::{
    BitCounter, BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr, UnsignedInteger,
    UnsignedVariableInteger,
};

mod actor;
mod math;
mod persist;
mod protocol;
mod types;
mod wrapping_number;

pub use actor::{
    field, field_id_by_name, field_spec, ActorFields, FieldError, FieldHook, FieldMut, FieldRef,
    FieldSpec, Value, ValueKind, FIELD_TABLE,
};
pub use math::{Color, Quat, Transform, Vec3};
pub use persist::{
    upgrade, PersistError, PersistedRecord, SceneFile, UpgradeRule, CURRENT_VERSION, UPGRADE_RULES,
};
pub use protocol::{
    ActorMessage, Envelope, OrderedReceiver, ProtocolError, ReceiverError, ReliableSender, RemoteMessage, Rpc,
    RECEIVE_WINDOW,
};
pub use types::{FieldId, MessageIndex, OwnRequestReason, PeerId, ReplicationHandle, SlotIndex};
pub use wrapping_number::{forward_distance, sequence_greater_than, sequence_less_than};
