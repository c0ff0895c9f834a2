use troupe_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger, UnsignedVariableInteger};

use crate::{
    persist::PersistedRecord,
    protocol::actor_message::RemoteMessage,
    types::{OwnRequestReason, PeerId, ReplicationHandle},
};

/// Remote procedure calls exchanged between peers. Every call travels on the
/// ordered reliable channel between a pair of peers.
#[derive(Clone, Debug, PartialEq)]
pub enum Rpc {
    /// Full snapshot of a newly created actor
    CreateReplica {
        handle: ReplicationHandle,
        owner: PeerId,
        epoch: u32,
        lock_wanted: bool,
        record: PersistedRecord,
    },
    /// The owner destroyed the actor
    DestroyReplica { handle: ReplicationHandle },
    /// A non-owner asks the owner to destroy the actor
    RequestDestroy { handle: ReplicationHandle },
    /// A non-owner asks the owner for write ownership
    RequestOwnershipTransfer {
        handle: ReplicationHandle,
        reason: OwnRequestReason,
    },
    /// The owner handed the actor to `new_owner`
    TransferOwnership {
        handle: ReplicationHandle,
        new_owner: PeerId,
        epoch: u32,
    },
    /// The owner's current field values. `epoch` is the sender's ownership
    /// epoch, so a receiver that missed the transfer can still place it.
    SyncState {
        handle: ReplicationHandle,
        epoch: u32,
        lock_wanted: bool,
        record: PersistedRecord,
    },
    /// The owner's script memory. Last write wins.
    SyncMemory {
        handle: ReplicationHandle,
        epoch: u32,
        memory_json: String,
    },
    /// Script messages for actors owned by the receiver, or broadcasts
    DeliverMessages { messages: Vec<RemoteMessage> },
    /// Starts or stops the simulation on every peer
    SetRunning { running: bool },
    /// Resets the game on every peer
    ResetGame,
}

impl Rpc {
    pub fn name(&self) -> &'static str {
        match self {
            Rpc::CreateReplica { .. } => "CreateReplica",
            Rpc::DestroyReplica { .. } => "DestroyReplica",
            Rpc::RequestDestroy { .. } => "RequestDestroy",
            Rpc::RequestOwnershipTransfer { .. } => "RequestOwnershipTransfer",
            Rpc::TransferOwnership { .. } => "TransferOwnership",
            Rpc::SyncState { .. } => "SyncState",
            Rpc::SyncMemory { .. } => "SyncMemory",
            Rpc::DeliverMessages { .. } => "DeliverMessages",
            Rpc::SetRunning { .. } => "SetRunning",
            Rpc::ResetGame => "ResetGame",
        }
    }

    /// The actor this call refers to, if any
    pub fn handle(&self) -> Option<ReplicationHandle> {
        match self {
            Rpc::CreateReplica { handle, .. }
            | Rpc::DestroyReplica { handle }
            | Rpc::RequestDestroy { handle }
            | Rpc::RequestOwnershipTransfer { handle, .. }
            | Rpc::TransferOwnership { handle, .. }
            | Rpc::SyncState { handle, .. }
            | Rpc::SyncMemory { handle, .. } => Some(*handle),
            Rpc::DeliverMessages { .. } | Rpc::SetRunning { .. } | Rpc::ResetGame => None,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Rpc::CreateReplica { .. } => 0,
            Rpc::DestroyReplica { .. } => 1,
            Rpc::RequestDestroy { .. } => 2,
            Rpc::RequestOwnershipTransfer { .. } => 3,
            Rpc::TransferOwnership { .. } => 4,
            Rpc::SyncState { .. } => 5,
            Rpc::SyncMemory { .. } => 6,
            Rpc::DeliverMessages { .. } => 7,
            Rpc::SetRunning { .. } => 8,
            Rpc::ResetGame => 9,
        }
    }
}

fn ser_epoch(epoch: u32, writer: &mut dyn BitWrite) {
    UnsignedVariableInteger::<5>::new(epoch).ser(writer);
}

fn de_epoch(reader: &mut BitReader) -> Result<u32, SerdeErr> {
    let epoch = UnsignedVariableInteger::<5>::de(reader)?.get();
    u32::try_from(epoch).map_err(|_| SerdeErr::IntegerOverflow)
}

impl Serde for Rpc {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedInteger::<4>::new(self.tag()).ser(writer);
        match self {
            Rpc::CreateReplica {
                handle,
                owner,
                epoch,
                lock_wanted,
                record,
            } => {
                handle.ser(writer);
                owner.ser(writer);
                ser_epoch(*epoch, writer);
                lock_wanted.ser(writer);
                record.ser(writer);
            }
            Rpc::DestroyReplica { handle } | Rpc::RequestDestroy { handle } => {
                handle.ser(writer);
            }
            Rpc::RequestOwnershipTransfer { handle, reason } => {
                handle.ser(writer);
                reason.ser(writer);
            }
            Rpc::TransferOwnership {
                handle,
                new_owner,
                epoch,
            } => {
                handle.ser(writer);
                new_owner.ser(writer);
                ser_epoch(*epoch, writer);
            }
            Rpc::SyncState {
                handle,
                epoch,
                lock_wanted,
                record,
            } => {
                handle.ser(writer);
                ser_epoch(*epoch, writer);
                lock_wanted.ser(writer);
                record.ser(writer);
            }
            Rpc::SyncMemory {
                handle,
                epoch,
                memory_json,
            } => {
                handle.ser(writer);
                ser_epoch(*epoch, writer);
                memory_json.ser(writer);
            }
            Rpc::DeliverMessages { messages } => {
                messages.ser(writer);
            }
            Rpc::SetRunning { running } => {
                running.ser(writer);
            }
            Rpc::ResetGame => {}
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let tag = UnsignedInteger::<4>::de(reader)?.get();
        let rpc = match tag {
            0 => Rpc::CreateReplica {
                handle: Serde::de(reader)?,
                owner: Serde::de(reader)?,
                epoch: de_epoch(reader)?,
                lock_wanted: Serde::de(reader)?,
                record: Serde::de(reader)?,
            },
            1 => Rpc::DestroyReplica {
                handle: Serde::de(reader)?,
            },
            2 => Rpc::RequestDestroy {
                handle: Serde::de(reader)?,
            },
            3 => Rpc::RequestOwnershipTransfer {
                handle: Serde::de(reader)?,
                reason: Serde::de(reader)?,
            },
            4 => Rpc::TransferOwnership {
                handle: Serde::de(reader)?,
                new_owner: Serde::de(reader)?,
                epoch: de_epoch(reader)?,
            },
            5 => Rpc::SyncState {
                handle: Serde::de(reader)?,
                epoch: de_epoch(reader)?,
                lock_wanted: Serde::de(reader)?,
                record: Serde::de(reader)?,
            },
            6 => Rpc::SyncMemory {
                handle: Serde::de(reader)?,
                epoch: de_epoch(reader)?,
                memory_json: Serde::de(reader)?,
            },
            7 => Rpc::DeliverMessages {
                messages: Serde::de(reader)?,
            },
            8 => Rpc::SetRunning {
                running: Serde::de(reader)?,
            },
            9 => Rpc::ResetGame,
            _ => {
                return Err(SerdeErr::UnknownTag {
                    type_name: "Rpc",
                    tag,
                })
            }
        };
        Ok(rpc)
    }
}
