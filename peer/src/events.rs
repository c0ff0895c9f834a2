use std::vec::Drain;

use troupe_shared::{ActorMessage, FieldHook, PeerId};

/// Something the host application may want to react to
#[derive(Clone, Debug, PartialEq)]
pub enum WorldEvent {
    /// An actor was created, locally or as a replica
    ActorSpawned { name: String, is_replica: bool },
    ActorDestroyed { name: String },
    ActorRenamed { old_name: String, new_name: String },
    OwnershipGained { name: String },
    OwnershipLost { name: String, new_owner: PeerId },
    /// A field with an on-change hook changed; the host recomputes the
    /// derived state (parenting, offstage, physics body, renderable)
    DerivedStateChanged { name: String, hook: FieldHook },
    /// A script message addressed to the host
    HostMessage(ActorMessage),
    RunningChanged { running: bool },
    GameReset,
}

/// Events collected since the host last drained them
#[derive(Default)]
pub struct WorldEvents {
    events: Vec<WorldEvent>,
}

impl WorldEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorldEvent> {
        self.events.iter()
    }

    pub fn drain(&mut self) -> Drain<'_, WorldEvent> {
        self.events.drain(..)
    }

    pub(crate) fn push(&mut self, event: WorldEvent) {
        self.events.push(event);
    }
}
