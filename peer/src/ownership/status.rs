use std::time::Duration;

use troupe_shared::PeerId;

/// Who may write an actor, as seen from this peer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnershipStatus {
    /// This peer is the single writer
    Local,
    /// Another peer is the single writer
    Remote(PeerId),
    /// Another peer owns the actor and this peer has asked for it
    TransferPending { owner: PeerId, since: Duration },
}

impl OwnershipStatus {
    pub fn is_local(&self) -> bool {
        matches!(self, OwnershipStatus::Local)
    }

    /// The remote owner, if any
    pub fn remote_owner(&self) -> Option<PeerId> {
        match self {
            OwnershipStatus::Local => None,
            OwnershipStatus::Remote(owner) | OwnershipStatus::TransferPending { owner, .. } => {
                Some(*owner)
            }
        }
    }
}

/// Whether an actor can be edited from this peer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockStatus {
    Unlocked,
    LockedBy(PeerId),
}
