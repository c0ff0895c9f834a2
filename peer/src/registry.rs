use std::collections::{BTreeMap, HashMap, HashSet};

use log::warn;

use troupe_shared::{PeerId, PersistedRecord, ReplicationHandle, Transform};

use crate::{
    actor::{Actor, ActorHandle},
    error::RegistryError,
    hierarchy::{self, ParentLink},
};

/// Owns every live actor on this peer and the indexes over them
pub struct ActorRegistry {
    local_peer: PeerId,
    next_handle: u64,
    next_replication_index: u32,
    actors: BTreeMap<ActorHandle, Actor>,
    by_name: HashMap<String, ActorHandle>,
    by_replication: HashMap<ReplicationHandle, ActorHandle>,
    retired_names: HashSet<String>,
    retired_handles: HashSet<ReplicationHandle>,
    snapshot: Vec<ActorHandle>,
    snapshot_stale: bool,
    snapshot_rebuilds: usize,
}

impl ActorRegistry {
    pub fn new(local_peer: PeerId) -> Self {
        Self {
            local_peer,
            next_handle: 0,
            next_replication_index: 0,
            actors: BTreeMap::new(),
            by_name: HashMap::new(),
            by_replication: HashMap::new(),
            retired_names: HashSet::new(),
            retired_handles: HashSet::new(),
            snapshot: Vec::new(),
            snapshot_stale: false,
            snapshot_rebuilds: 0,
        }
    }

    // Creation

    /// Creates a locally owned actor under a generated name
    pub fn create(&mut self, initial_transform: Transform) -> ActorHandle {
        let (name, replication_handle) = loop {
            let index = self.allocate_replication_index();
            let name = format!("actor-{}-{}", self.local_peer.value(), index);
            if self.check_name(&name).is_ok() {
                break (name, ReplicationHandle::new(self.local_peer, index));
            }
        };

        let handle = self.insert(name, replication_handle, self.local_peer);
        if let Some(actor) = self.actors.get_mut(&handle) {
            actor.fields.position = initial_transform.position;
            actor.fields.rotation = initial_transform.rotation;
            actor.fields.spawn_position = initial_transform.position;
            actor.fields.spawn_rotation = initial_transform.rotation;
        }
        handle
    }

    /// Creates a locally owned actor from a record, keeping the record's name
    pub fn create_named(&mut self, record: PersistedRecord) -> Result<ActorHandle, RegistryError> {
        self.check_name(&record.name)?;
        let index = self.allocate_replication_index();
        let replication_handle = ReplicationHandle::new(self.local_peer, index);
        let handle = self.insert(record.name.clone(), replication_handle, self.local_peer);
        if let Some(actor) = self.actors.get_mut(&handle) {
            actor.load(record);
        }
        Ok(handle)
    }

    /// Creates the local copy of an actor owned by another peer
    pub fn create_replica(
        &mut self,
        replication_handle: ReplicationHandle,
        owner: PeerId,
        epoch: u32,
        lock_wanted: bool,
        record: PersistedRecord,
    ) -> Result<ActorHandle, RegistryError> {
        if self.by_replication.contains_key(&replication_handle)
            || self.retired_handles.contains(&replication_handle)
        {
            return Err(RegistryError::DuplicateHandle {
                handle: replication_handle,
            });
        }
        self.check_name(&record.name)?;

        let handle = self.insert(record.name.clone(), replication_handle, owner);
        if let Some(actor) = self.actors.get_mut(&handle) {
            actor.epoch = epoch;
            actor.lock_wanted_by_owner = lock_wanted;
            actor.load(record);
        }
        Ok(handle)
    }

    // Destruction

    /// Removes the actor and retires its name and replication handle
    pub fn destroy_local(&mut self, handle: ActorHandle) -> Option<Actor> {
        let actor = self.actors.remove(&handle)?;
        if self.by_name.get(actor.name()) == Some(&handle) {
            self.by_name.remove(actor.name());
        }
        self.by_replication.remove(&actor.replication_handle());
        self.retired_names.insert(actor.name().to_string());
        self.retired_handles.insert(actor.replication_handle());
        self.snapshot_stale = true;
        Some(actor)
    }

    /// Removes every actor. Tombstones are kept.
    pub fn clear(&mut self) -> Vec<Actor> {
        let handles: Vec<ActorHandle> = self.actors.keys().copied().collect();
        handles
            .into_iter()
            .filter_map(|handle| self.destroy_local(handle))
            .collect()
    }

    // Lookup

    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn get_by_name(&self, name: &str) -> Option<ActorHandle> {
        self.by_name.get(name).copied()
    }

    pub fn get_by_replication(&self, replication_handle: &ReplicationHandle) -> Option<ActorHandle> {
        self.by_replication.get(replication_handle).copied()
    }

    pub fn is_retired_name(&self, name: &str) -> bool {
        self.retired_names.contains(name)
    }

    pub fn is_retired_handle(&self, replication_handle: &ReplicationHandle) -> bool {
        self.retired_handles.contains(replication_handle)
    }

    pub fn get(&self, handle: ActorHandle) -> Option<&Actor> {
        self.actors.get(&handle)
    }

    pub fn get_mut(&mut self, handle: ActorHandle) -> Option<&mut Actor> {
        self.actors.get_mut(&handle)
    }

    pub fn actor(&self, name: &str) -> Option<&Actor> {
        self.get_by_name(name).and_then(|handle| self.actors.get(&handle))
    }

    pub fn actor_mut(&mut self, name: &str) -> Option<&mut Actor> {
        let handle = self.get_by_name(name)?;
        self.actors.get_mut(&handle)
    }

    /// Live actors in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Actor> {
        self.actors.values_mut()
    }

    // Names

    pub fn rename(&mut self, handle: ActorHandle, new_name: &str) -> Result<(), RegistryError> {
        let old_name = match self.actors.get(&handle) {
            Some(actor) => actor.name().to_string(),
            None => return Err(RegistryError::UnknownActor { handle }),
        };
        if old_name == new_name {
            return Ok(());
        }
        self.check_name(new_name)?;

        if self.by_name.get(&old_name) == Some(&handle) {
            self.by_name.remove(&old_name);
        } else {
            warn!(
                "Name index entry for {} did not point at {:?}; leaving it in place",
                old_name, handle
            );
        }
        self.by_name.insert(new_name.to_string(), handle);
        if let Some(actor) = self.actors.get_mut(&handle) {
            actor.set_name(new_name.to_string());
            actor.state_dirty = true;
        }
        self.retired_names.insert(old_name);
        self.snapshot_stale = true;
        Ok(())
    }

    // Snapshot

    /// Dense creation-ordered handles. Recomputed only after membership or
    /// names changed.
    pub fn snapshot_ordered(&mut self) -> Vec<ActorHandle> {
        if self.snapshot_stale {
            self.snapshot = self.actors.keys().copied().collect();
            self.snapshot_stale = false;
            self.snapshot_rebuilds += 1;
        }
        self.snapshot.clone()
    }

    /// How many times the ordered snapshot has been recomputed
    pub fn snapshot_rebuilds(&self) -> usize {
        self.snapshot_rebuilds
    }

    // Hierarchy

    /// Parent name along `link`, `Some("")` for roots, `None` for unknown actors
    pub fn parent_name(&self, name: &str, link: ParentLink) -> Option<&str> {
        self.actor(name)
            .map(|actor| actor.fields.get_string(link.field()).unwrap_or_default())
    }

    /// Detaches `handle` from any parent that would close a cycle or make
    /// the chain deeper than `max_depth`. Used for links that arrive with a
    /// whole record instead of through a checked setter. Returns the links
    /// that were cleared.
    pub fn clear_invalid_parents(&mut self, handle: ActorHandle, max_depth: usize) -> Vec<ParentLink> {
        let mut cleared = Vec::new();
        for link in [ParentLink::Transform, ParentLink::Spawn] {
            let Some(actor) = self.actors.get(&handle) else {
                break;
            };
            let parent = actor.fields.get_string(link.field()).unwrap_or_default();
            let verdict = hierarchy::check_reparent(actor.name(), parent, max_depth, |name: &str| {
                self.parent_name(name, link)
            });
            let Err(violation) = verdict else {
                continue;
            };

            warn!(
                "Detaching {} from parent {}: {}",
                actor.name(),
                parent,
                violation
            );
            if let Some(actor) = self.actors.get_mut(&handle) {
                let _ = actor.fields.set_string(link.field(), "");
            }
            cleared.push(link);
        }
        cleared
    }

    /// Topmost transform ancestor of `name`
    pub fn root_of(&self, name: &str, max_depth: usize) -> Option<ActorHandle> {
        let start = self.actor(name)?.name();
        let root = hierarchy::root_of(start, max_depth, |name: &str| {
            self.parent_name(name, ParentLink::Transform)
        })?;
        self.get_by_name(root)
    }

    /// Every other member of `handle`'s clone group: the original and all of
    /// its clones, excluding `handle` itself.
    pub fn copies_of(&self, handle: ActorHandle) -> Vec<ActorHandle> {
        let Some(actor) = self.actors.get(&handle) else {
            return Vec::new();
        };
        let parent = actor.fields.clone_parent.as_str();
        let group = if parent.is_empty() { actor.name() } else { parent };

        self.actors
            .values()
            .filter(|other| other.handle() != handle)
            .filter(|other| {
                other.name() == group || other.fields.clone_parent == group
            })
            .map(Actor::handle)
            .collect()
    }

    // Private

    fn allocate_replication_index(&mut self) -> u32 {
        let index = self.next_replication_index;
        self.next_replication_index = self.next_replication_index.wrapping_add(1);
        index
    }

    fn check_name(&self, name: &str) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateName {
                name: name.to_string(),
            });
        }
        if self.retired_names.contains(name) {
            return Err(RegistryError::NameRetired {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn insert(
        &mut self,
        name: String,
        replication_handle: ReplicationHandle,
        owner: PeerId,
    ) -> ActorHandle {
        let handle = ActorHandle::new(self.next_handle);
        self.next_handle += 1;

        let actor = Actor::new(handle, name.clone(), replication_handle, self.local_peer, owner);
        self.by_name.insert(name, handle);
        self.by_replication.insert(replication_handle, handle);
        self.actors.insert(handle, actor);
        self.snapshot_stale = true;
        handle
    }
}
