use std::time::Duration;

use troupe_shared::{ActorFields, PeerId, PersistedRecord, ReplicationHandle};

use crate::ownership::OwnershipStatus;

/// Process-local key of a live actor. Handles increase with creation order
/// and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorHandle(u64);

impl ActorHandle {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A uniquely named, replicated and scriptable entity
#[derive(Debug)]
pub struct Actor {
    handle: ActorHandle,
    name: String,
    replication_handle: ReplicationHandle,
    local_peer: PeerId,

    pub(crate) owner: PeerId,
    pub(crate) epoch: u32,
    pub(crate) transfer_requested_at: Option<Duration>,
    pub(crate) lock_wanted_by_owner: bool,
    pub(crate) last_ownership_change: Option<Duration>,
    pub(crate) last_local_player_collision: Option<Duration>,

    pub(crate) fields: ActorFields,
    pub(crate) tags: Vec<String>,
    pub(crate) memory_json: String,

    /// Fields changed since the last `SyncState`
    pub(crate) state_dirty: bool,
    /// Script memory changed since the last `SyncMemory`
    pub(crate) memory_dirty: bool,
    /// Included in the next tick snapshot
    pub(crate) needs_script_sync: bool,
    /// Memory arrived from the network and must be pushed to the script
    pub(crate) memory_received: bool,
}

impl Actor {
    pub(crate) fn new(
        handle: ActorHandle,
        name: String,
        replication_handle: ReplicationHandle,
        local_peer: PeerId,
        owner: PeerId,
    ) -> Self {
        Self {
            handle,
            name,
            replication_handle,
            local_peer,
            owner,
            epoch: 0,
            transfer_requested_at: None,
            lock_wanted_by_owner: false,
            last_ownership_change: None,
            last_local_player_collision: None,
            fields: ActorFields::default(),
            tags: Vec::new(),
            memory_json: String::new(),
            state_dirty: false,
            memory_dirty: false,
            needs_script_sync: true,
            memory_received: false,
        }
    }

    // Public

    pub fn handle(&self) -> ActorHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn replication_handle(&self) -> ReplicationHandle {
        self.replication_handle
    }

    pub fn fields(&self) -> &ActorFields {
        &self.fields
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Last memory blob pulled from the script runtime or received from the owner
    pub fn memory_json(&self) -> &str {
        &self.memory_json
    }

    pub fn owning_peer(&self) -> PeerId {
        self.owner
    }

    pub fn is_locally_owned(&self) -> bool {
        self.owner == self.local_peer
    }

    pub fn ownership(&self) -> OwnershipStatus {
        if self.is_locally_owned() {
            return OwnershipStatus::Local;
        }
        match self.transfer_requested_at {
            Some(since) => OwnershipStatus::TransferPending {
                owner: self.owner,
                since,
            },
            None => OwnershipStatus::Remote(self.owner),
        }
    }

    pub fn ownership_epoch(&self) -> u32 {
        self.epoch
    }

    /// The owner's lock flag, as last replicated
    pub fn lock_wanted_by_owner(&self) -> bool {
        self.lock_wanted_by_owner
    }

    pub fn has_dirty_state(&self) -> bool {
        self.state_dirty
    }

    pub fn has_dirty_memory(&self) -> bool {
        self.memory_dirty
    }

    /// Snapshots every field, the tags and the memory blob under the current
    /// version stamp
    pub fn save(&self) -> PersistedRecord {
        PersistedRecord::new(
            &self.name,
            self.fields.clone(),
            self.tags.clone(),
            self.memory_json.clone(),
        )
    }

    /// Like [`save`](Self::save) but leaves the memory blob out, for field
    /// replication where memory travels separately
    pub fn save_state(&self) -> PersistedRecord {
        PersistedRecord::new(&self.name, self.fields.clone(), self.tags.clone(), String::new())
    }

    // Crate-public

    /// Upgrades the record and applies its fields, tags and memory. The
    /// actor keeps its name: names are owned by the registry.
    pub(crate) fn load(&mut self, record: PersistedRecord) {
        let record = record.upgraded();
        self.fields = record.fields;
        self.tags = record.tags;
        if !record.memory_json.is_empty() {
            self.memory_json = record.memory_json;
        }
        self.needs_script_sync = true;
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_owner(&mut self, owner: PeerId, epoch: u32, now: Duration) {
        self.owner = owner;
        self.epoch = epoch;
        self.transfer_requested_at = None;
        self.last_ownership_change = Some(now);
        self.needs_script_sync = true;
    }
}
