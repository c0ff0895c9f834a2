use thiserror::Error;

use troupe_shared::{PeerId, ReplicationHandle};

use crate::actor::ActorHandle;

/// Errors raised by the actor registry. Every check runs before any mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Actor names must be non-empty
    #[error("Actor names cannot be empty")]
    EmptyName,

    /// Another live actor already uses this name
    #[error("Actor name '{name}' is already in use")]
    DuplicateName { name: String },

    /// The name belonged to a destroyed actor and may still be referenced by replicas
    #[error("Actor name '{name}' belonged to a destroyed actor and cannot be reused")]
    NameRetired { name: String },

    /// Only the owner may rename an actor
    #[error("Actor '{name}' is not locally owned")]
    NotLocallyOwned { name: String },

    /// No live actor has this name
    #[error("No actor named '{name}'")]
    UnknownName { name: String },

    /// No live actor has this handle
    #[error("No actor with handle {handle:?}")]
    UnknownActor { handle: ActorHandle },

    /// A replica with this replication handle already exists, or existed
    #[error("Replication handle {handle} is already in use or was retired")]
    DuplicateHandle { handle: ReplicationHandle },
}

/// Errors raised by the lock reference counts
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    /// `unwant_lock` was called more times than `want_lock`
    #[error("Unmatched unwant_lock on actor '{actor}': the want count is already zero")]
    UnmatchedUnwant { actor: String },

    /// The named actor does not exist
    #[error("Cannot change the lock of unknown actor '{actor}'")]
    UnknownActor { actor: String },
}

/// Errors reported by a [`Transport`](crate::Transport) implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to send {length} bytes to {peer}: {reason}")]
    SendFailed {
        peer: PeerId,
        length: usize,
        reason: String,
    },

    #[error("Failed to receive from the transport: {reason}")]
    ReceiveFailed { reason: String },
}

/// Errors reported by a [`ScriptBoundary`](crate::ScriptBoundary) implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    /// The scripting runtime failed while running the tick
    #[error("Script runtime failed: {reason}")]
    RuntimeFailed { reason: String },

    /// The scripting runtime answered with something that is not a tick response
    #[error("Malformed tick response: {reason}")]
    MalformedResponse { reason: String },
}

/// Errors returned by [`World::tick`](crate::World::tick)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The script boundary failed. The world is halted and nothing from the
    /// failed tick was applied.
    #[error("Script boundary failed on tick {tick}: {source}")]
    ScriptBoundary {
        tick: u64,
        #[source]
        source: ScriptError,
    },

    /// A previous tick failed fatally
    #[error("The world was halted by an earlier script boundary failure")]
    Halted,

    #[error(transparent)]
    Transport(#[from] TransportError),
}
