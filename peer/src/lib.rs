//! # Troupe Peer
//! One participant of a shared actor session: keeps the local actor
//! registry, arbitrates single-writer ownership with the other peers,
//! replicates actor state over reliable ordered channels and drives the
//! embedded script runtime once per tick.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use troupe_shared::{
        field, ActorFields, ActorMessage, Color, FieldError, FieldHook, FieldId, OwnRequestReason,
        PeerId, PersistError, PersistedRecord, Quat, ReplicationHandle, SceneFile, SlotIndex,
        Transform, Value, ValueKind, Vec3,
    };
}

mod actor;
mod config;
mod error;
mod events;
mod field_codec;
mod hierarchy;
mod ownership;
mod physics;
mod registry;
mod replication;
mod script;
mod world;

pub use actor::{Actor, ActorHandle};
pub use config::{EngineConfig, OwnershipConfig, ReplicationConfig};
pub use error::{EngineError, LockError, RegistryError, ScriptError, TransportError};
pub use events::{WorldEvent, WorldEvents};
pub use field_codec::{FieldCodec, StagedWrite};
pub use hierarchy::{check_reparent, HierarchyViolation, ParentLink};
pub use ownership::{
    evaluate_transfer_request, is_local_resource, shareable_record, LockManager, LockStatus,
    OwnershipContinuation, OwnershipStatus, PendingOwnershipRequests, PendingPoll,
    TransferContext, TransferDenial, NOT_AVAILABLE_URI,
};
pub use physics::{NullPhysics, PhysicsSink};
pub use registry::ActorRegistry;
pub use replication::{
    group_by_destination, HandleWaitlist, MemorySyncQueue, MemorySyncStats, MessageGroup,
    MessageRoute, PeerChanges, RateGate, ReplicationAdapter, Transport,
};
pub use script::{
    ActorRuntimeState, ScriptBoundary, SlotTorque, SlotVelocity, SpawnRequest, TickRequest,
    TickResponse, TouchEvent,
};
pub use world::{TickOutcome, TickPhase, World};
