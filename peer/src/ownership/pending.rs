use std::time::Duration;

use crate::{actor::ActorHandle, world::World};

/// Work to run once an actor becomes locally owned. Receives the world and
/// the actor's current name.
pub type OwnershipContinuation = Box<dyn FnOnce(&mut World, &str)>;

/// Outcome of polling one pending request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingPoll {
    /// Ownership is local: run the continuation
    Ready,
    /// Keep waiting
    Waiting,
    /// Drop the continuation without running it
    Abandoned,
}

pub(crate) struct PendingOwnershipRequest {
    pub(crate) actor: ActorHandle,
    pub(crate) deadline: Duration,
    pub(crate) continuation: OwnershipContinuation,
}

/// Continuations waiting for ownership of an actor
#[derive(Default)]
pub struct PendingOwnershipRequests {
    requests: Vec<PendingOwnershipRequest>,
}

impl PendingOwnershipRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub(crate) fn push(
        &mut self,
        actor: ActorHandle,
        deadline: Duration,
        continuation: OwnershipContinuation,
    ) {
        self.requests.push(PendingOwnershipRequest {
            actor,
            deadline,
            continuation,
        });
    }

    /// Removes every request so the caller can poll them while holding the
    /// world mutably. Requests still waiting go back through `push`.
    pub(crate) fn take_all(&mut self) -> Vec<PendingOwnershipRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Drops the requests of a destroyed actor
    pub(crate) fn forget(&mut self, actor: ActorHandle) {
        self.requests.retain(|request| request.actor != actor);
    }

    pub(crate) fn clear(&mut self) {
        self.requests.clear();
    }
}
