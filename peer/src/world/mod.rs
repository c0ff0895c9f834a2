mod clones;
mod inbound;
mod scene;
mod tick;

pub use tick::{TickOutcome, TickPhase};

use std::time::Duration;

use log::{debug, info, warn};

use troupe_shared::{
    field, ActorMessage, FieldError, FieldHook, FieldId, OwnRequestReason, PeerId, PersistedRecord,
    Rpc, Transform, Value,
};

use crate::{
    actor::{Actor, ActorHandle},
    config::EngineConfig,
    error::{LockError, RegistryError},
    events::{WorldEvent, WorldEvents},
    field_codec::{apply_write, FieldCodec},
    ownership::{
        shareable_record, LockManager, LockStatus, OwnershipContinuation, OwnershipStatus,
        PendingOwnershipRequests, PendingPoll,
    },
    registry::ActorRegistry,
    replication::{HandleWaitlist, MemorySyncQueue, MemorySyncStats, ReplicationAdapter, Transport},
};

/// A touch reported by physics, kept by handle until the next snapshot
#[derive(Clone, Copy, Debug)]
struct QueuedTouch {
    receiver: ActorHandle,
    other: Option<ActorHandle>,
    is_enter: bool,
}

/// One peer's view of the shared actor world. Owns the registry, the
/// ownership state, the replication channels and the tick state machine.
///
/// Everything runs on the caller's thread. The host pumps it by calling
/// [`World::tick`] once per frame.
pub struct World {
    config: EngineConfig,
    local_peer: PeerId,
    clock: Duration,
    tick_count: u64,
    phase: TickPhase,
    halted: bool,
    initialized: bool,
    running: bool,
    single_step_queued: bool,

    registry: ActorRegistry,
    locks: LockManager,
    pending_ownership: PendingOwnershipRequests,
    replication: ReplicationAdapter,
    waitlist: HandleWaitlist,
    memory_sync: MemorySyncQueue,

    inbound_messages: Vec<ActorMessage>,
    touch_events: Vec<QueuedTouch>,
    actors_to_destroy: Vec<ActorHandle>,
    actors_to_destroy_local: Vec<ActorHandle>,
    local_player: Option<ActorHandle>,
    camera_actor: Option<ActorHandle>,
    events: WorldEvents,
}

impl World {
    pub fn new(config: EngineConfig, transport: Box<dyn Transport>) -> Self {
        let local_peer = transport.local_peer();
        let replication = ReplicationAdapter::new(transport, config.replication.resend_interval);
        let waitlist = HandleWaitlist::new(config.replication.waitlist_ttl);
        let memory_sync = MemorySyncQueue::new(config.replication.memory_sync_interval());

        Self {
            config,
            local_peer,
            clock: Duration::ZERO,
            tick_count: 0,
            phase: TickPhase::Idle,
            halted: false,
            initialized: false,
            running: false,
            single_step_queued: false,
            registry: ActorRegistry::new(local_peer),
            locks: LockManager::new(),
            pending_ownership: PendingOwnershipRequests::new(),
            replication,
            waitlist,
            memory_sync,
            inbound_messages: Vec::new(),
            touch_events: Vec::new(),
            actors_to_destroy: Vec::new(),
            actors_to_destroy_local: Vec::new(),
            local_player: None,
            camera_actor: None,
            events: WorldEvents::new(),
        }
    }

    // Status

    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sum of every `dt` passed to [`World::tick`]
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Number of completed script ticks
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_single_step_queued(&self) -> bool {
        self.single_step_queued
    }

    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    pub fn actor(&self, name: &str) -> Option<&Actor> {
        self.registry.actor(name)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.registry.iter()
    }

    pub fn events(&self) -> &WorldEvents {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<WorldEvent> {
        self.events.drain().collect()
    }

    pub fn memory_sync_stats(&self) -> MemorySyncStats {
        self.memory_sync.stats(self.clock)
    }

    /// Calls sent to other peers and not acknowledged yet
    pub fn unacked_len(&self) -> usize {
        self.replication.unacked_len()
    }

    /// Inbound calls held until their replica is created
    pub fn waitlist_len(&self) -> usize {
        self.waitlist.len()
    }

    pub fn pending_ownership_len(&self) -> usize {
        self.pending_ownership.len()
    }

    // Session

    /// Inbound calls are dropped until this is called
    pub fn mark_initialized(&mut self) {
        if !self.initialized {
            info!("World of {} initialized", self.local_peer);
            self.initialized = true;
        }
    }

    /// Starts or stops the simulation here and on every other peer
    pub fn set_running(&mut self, running: bool) {
        self.replication.broadcast(Rpc::SetRunning { running });
        self.apply_running(running);
    }

    /// Runs the script once on the next tick even if the world is stopped
    pub fn queue_single_step(&mut self) {
        self.single_step_queued = true;
    }

    /// Resets the game here and on every other peer
    pub fn reset_game(&mut self) {
        self.apply_reset();
        self.replication.broadcast(Rpc::ResetGame);
    }

    /// Queues a message for the script, delivered with the next tick
    pub fn enqueue_message(&mut self, message: ActorMessage) {
        self.inbound_messages.push(message);
    }

    // Actors

    /// Creates a locally owned actor under a generated name and announces it
    pub fn create_actor(&mut self, transform: Transform) -> String {
        let handle = self.registry.create(transform);
        self.announce_created(handle)
    }

    /// Creates a locally owned actor from a saved record and announces it.
    /// Parent links that would close a cycle are dropped.
    pub fn create_actor_from_record(
        &mut self,
        record: PersistedRecord,
    ) -> Result<String, RegistryError> {
        let handle = self.registry.create_named(record)?;
        self.registry
            .clear_invalid_parents(handle, self.config.max_hierarchy_depth);
        Ok(self.announce_created(handle))
    }

    /// The owner destroys the actor and tells everyone; anyone else asks the
    /// owner to. Returns false for unknown names and for actors locked by
    /// another peer.
    pub fn destroy_actor(&mut self, name: &str) -> bool {
        let Some(handle) = self.registry.get_by_name(name) else {
            return false;
        };
        if self.locking_peer(handle, 0).is_some() {
            info!("Cannot destroy {}: locked by another peer", name);
            return false;
        }
        self.destroy_actor_by_handle(handle);
        true
    }

    /// Renames a locally owned actor. The new name reaches the other peers
    /// with the next state sync.
    pub fn rename_actor(&mut self, name: &str, new_name: &str) -> Result<(), RegistryError> {
        let handle = self.owned_handle(name)?;
        self.registry.rename(handle, new_name)?;
        self.events.push(WorldEvent::ActorRenamed {
            old_name: name.to_string(),
            new_name: new_name.to_string(),
        });
        Ok(())
    }

    pub fn set_tags(&mut self, name: &str, tags: Vec<String>) -> Result<(), RegistryError> {
        let handle = self.owned_handle(name)?;
        if let Some(actor) = self.registry.get_mut(handle) {
            if actor.tags != tags {
                actor.tags = tags;
                actor.state_dirty = true;
            }
        }
        Ok(())
    }

    pub fn get_field(&self, name: &str, field: FieldId) -> Result<Value, FieldError> {
        let actor = self
            .registry
            .actor(name)
            .ok_or_else(|| FieldError::UnknownActor {
                name: name.to_string(),
            })?;
        actor.fields().get(field)
    }

    /// Writes one field of a locally owned actor, with the same checks the
    /// script boundary gets
    pub fn set_field(&mut self, name: &str, field: FieldId, value: Value) -> Result<(), FieldError> {
        let handle = self
            .registry
            .get_by_name(name)
            .ok_or_else(|| FieldError::UnknownActor {
                name: name.to_string(),
            })?;
        let slots = [handle];
        let writes = {
            let mut codec = FieldCodec::new(&self.registry, &slots, self.config.max_hierarchy_depth);
            codec.try_set_field(0, field, value)?;
            codec.into_staged()
        };
        for write in writes {
            let actor = write.actor;
            if let Some(hook) = apply_write(&mut self.registry, write)? {
                self.push_derived_state_event(actor, hook);
            }
        }
        Ok(())
    }

    /// Returns false when the reparent was refused
    pub fn set_transform_parent(&mut self, name: &str, parent: &str) -> bool {
        match self.set_field(
            name,
            field::TRANSFORM_PARENT,
            Value::Str(parent.to_string()),
        ) {
            Ok(()) => true,
            Err(error) => {
                warn!("{}", error);
                false
            }
        }
    }

    // Ownership

    pub fn is_locally_owned(&self, name: &str) -> bool {
        self.registry
            .actor(name)
            .map_or(false, Actor::is_locally_owned)
    }

    pub fn ownership(&self, name: &str) -> Option<OwnershipStatus> {
        self.registry.actor(name).map(Actor::ownership)
    }

    pub fn is_locked_by_another(&self, name: &str) -> bool {
        self.registry
            .get_by_name(name)
            .map_or(false, |handle| self.locking_peer(handle, 0).is_some())
    }

    pub fn lock_status(&self, name: &str) -> LockStatus {
        match self
            .registry
            .get_by_name(name)
            .and_then(|handle| self.locking_peer(handle, 0))
        {
            Some(peer) => LockStatus::LockedBy(peer),
            None => LockStatus::Unlocked,
        }
    }

    /// Adds one local lock want. The first want makes the owner refuse every
    /// transfer request and tells the other peers the actor is locked.
    pub fn want_lock(&mut self, name: &str) -> Result<(), LockError> {
        let handle = self.lock_handle(name)?;
        if self.locks.want(handle) {
            self.mark_lock_changed(handle);
        }
        Ok(())
    }

    pub fn unwant_lock(&mut self, name: &str) -> Result<(), LockError> {
        let handle = self.lock_handle(name)?;
        if self.locks.unwant(handle, name)? {
            self.mark_lock_changed(handle);
        }
        Ok(())
    }

    pub fn lock_want_count(&self, name: &str) -> u32 {
        self.registry
            .get_by_name(name)
            .map_or(0, |handle| self.locks.want_count(handle))
    }

    /// Asks the owner for the actor. Does nothing when the actor is already
    /// ours or locked by another peer.
    pub fn request_ownership(&mut self, name: &str, reason: OwnRequestReason) {
        if let Some(handle) = self.registry.get_by_name(name) {
            self.request_ownership_by_handle(handle, reason);
        }
    }

    /// Requests ownership and runs `continuation` once it is local. The
    /// continuation is dropped without running if the request times out,
    /// the actor is destroyed or another peer locks it.
    pub fn request_ownership_then<F>(&mut self, name: &str, continuation: F)
    where
        F: FnOnce(&mut World, &str) + 'static,
    {
        let timeout = self.config.ownership.request_timeout;
        self.request_ownership_then_with_timeout(name, timeout, continuation);
    }

    pub fn request_ownership_then_with_timeout<F>(
        &mut self,
        name: &str,
        timeout: Duration,
        continuation: F,
    ) where
        F: FnOnce(&mut World, &str) + 'static,
    {
        let Some(handle) = self.registry.get_by_name(name) else {
            debug!("Not requesting ownership of unknown actor {}", name);
            return;
        };
        if self.locking_peer(handle, 0).is_some() {
            return;
        }
        if self.is_locally_owned(name) {
            continuation(self, name);
            return;
        }

        self.request_ownership_by_handle(handle, OwnRequestReason::Default);
        let continuation: OwnershipContinuation = Box::new(continuation);
        self.pending_ownership
            .push(handle, self.clock + timeout, continuation);
    }

    /// Names this peer's player actor. It resists collision transfer requests.
    pub fn set_local_player(&mut self, name: Option<&str>) {
        self.local_player = name.and_then(|name| self.registry.get_by_name(name));
    }

    /// Names the actor driving this peer's camera. It resists collision
    /// transfer requests.
    pub fn set_camera_actor(&mut self, name: Option<&str>) {
        self.camera_actor = name.and_then(|name| self.registry.get_by_name(name));
    }

    /// Records that the local player touched `other` and, unless `other` is
    /// another player, asks for it with a collision request
    pub fn report_player_collision(&mut self, other: &str) {
        let now = self.clock;
        let Some(actor) = self.registry.actor_mut(other) else {
            return;
        };
        actor.last_local_player_collision = Some(now);
        if actor.fields.is_player_controllable || actor.is_locally_owned() {
            return;
        }
        let handle = actor.handle();
        self.request_ownership_by_handle(handle, OwnRequestReason::Collision);
    }

    // Script inputs

    /// Queues a touch for the script. Returns false if the receiver is
    /// unknown or not owned here.
    pub fn queue_touch_event(&mut self, receiver: &str, other: Option<&str>, is_enter: bool) -> bool {
        let Some(receiver) = self
            .registry
            .actor(receiver)
            .filter(|actor| actor.is_locally_owned())
            .map(Actor::handle)
        else {
            return false;
        };
        let other = other.and_then(|name| self.registry.get_by_name(name));
        self.touch_events.push(QueuedTouch {
            receiver,
            other,
            is_enter,
        });
        true
    }

    // Crate-public

    pub(crate) fn apply_running(&mut self, running: bool) {
        if self.running != running {
            info!("Simulation {}", if running { "started" } else { "stopped" });
            self.running = running;
            self.events.push(WorldEvent::RunningChanged { running });
        }
    }

    pub(crate) fn apply_reset(&mut self) {
        self.inbound_messages
            .push(ActorMessage::broadcast("ResetGame", "{}"));
        if !self.running {
            self.single_step_queued = true;
        }
        self.events.push(WorldEvent::GameReset);
    }

    pub(crate) fn create_replica_rpc(&self, actor: &Actor) -> Rpc {
        Rpc::CreateReplica {
            handle: actor.replication_handle(),
            owner: actor.owning_peer(),
            epoch: actor.ownership_epoch(),
            lock_wanted: self.locks.is_wanted(actor.handle()),
            record: shareable_record(actor.save()),
        }
    }

    pub(crate) fn announce_created(&mut self, handle: ActorHandle) -> String {
        let Some(actor) = self.registry.get(handle) else {
            return String::new();
        };
        let name = actor.name().to_string();
        let rpc = self.create_replica_rpc(actor);
        self.replication.broadcast(rpc);
        self.events.push(WorldEvent::ActorSpawned {
            name: name.clone(),
            is_replica: false,
        });
        name
    }

    pub(crate) fn destroy_actor_by_handle(&mut self, handle: ActorHandle) {
        let Some(actor) = self.registry.get(handle) else {
            return;
        };
        let replication_handle = actor.replication_handle();
        if actor.is_locally_owned() {
            self.destroy_local_only(handle);
            self.replication.broadcast(Rpc::DestroyReplica {
                handle: replication_handle,
            });
        } else {
            let owner = actor.owning_peer();
            self.replication.send_to(
                owner,
                Rpc::RequestDestroy {
                    handle: replication_handle,
                },
            );
        }
    }

    /// Removes the actor here only, along with its lock count, memory queue
    /// entry, pending continuations and queued touches
    pub(crate) fn destroy_local_only(&mut self, handle: ActorHandle) {
        let Some(actor) = self.registry.destroy_local(handle) else {
            return;
        };
        self.locks.forget(handle);
        self.memory_sync.remove(handle);
        self.pending_ownership.forget(handle);
        self.waitlist.discard(&actor.replication_handle());
        self.touch_events
            .retain(|touch| touch.receiver != handle && touch.other != Some(handle));
        if self.local_player == Some(handle) {
            self.local_player = None;
        }
        if self.camera_actor == Some(handle) {
            self.camera_actor = None;
        }
        debug!("Destroyed actor {}", actor.name());
        self.events.push(WorldEvent::ActorDestroyed {
            name: actor.name().to_string(),
        });
    }

    pub(crate) fn request_ownership_by_handle(
        &mut self,
        handle: ActorHandle,
        reason: OwnRequestReason,
    ) {
        if self.locking_peer(handle, 0).is_some() {
            return;
        }
        let now = self.clock;
        let Some(actor) = self.registry.get_mut(handle) else {
            return;
        };
        if actor.is_locally_owned() {
            return;
        }
        actor.transfer_requested_at = Some(now);
        let owner = actor.owning_peer();
        let replication_handle = actor.replication_handle();
        self.replication.send_to(
            owner,
            Rpc::RequestOwnershipTransfer {
                handle: replication_handle,
                reason,
            },
        );
    }

    /// The peer whose lock keeps this actor from being edited here, looking
    /// through the clone parent chain
    pub(crate) fn locking_peer(&self, handle: ActorHandle, depth: usize) -> Option<PeerId> {
        let actor = self.registry.get(handle)?;
        if !actor.is_locally_owned() && actor.lock_wanted_by_owner {
            return Some(actor.owning_peer());
        }
        if actor.fields.was_cloned_by_script || depth >= self.config.max_hierarchy_depth {
            return None;
        }
        let parent = actor.fields.clone_parent.as_str();
        if parent.is_empty() {
            return None;
        }
        self.registry
            .get_by_name(parent)
            .and_then(|parent| self.locking_peer(parent, depth + 1))
    }

    pub(crate) fn is_local_surrogate(&self, handle: ActorHandle) -> bool {
        self.local_player == Some(handle) || self.camera_actor == Some(handle)
    }

    pub(crate) fn push_derived_state_event(&mut self, handle: ActorHandle, hook: FieldHook) {
        if let Some(actor) = self.registry.get(handle) {
            self.events.push(WorldEvent::DerivedStateChanged {
                name: actor.name().to_string(),
                hook,
            });
        }
    }

    /// Runs ready continuations and drops abandoned ones
    pub(crate) fn poll_pending_ownership(&mut self) {
        for request in self.pending_ownership.take_all() {
            match self.poll_pending(request.actor, request.deadline) {
                PendingPoll::Ready => {
                    let name = self
                        .registry
                        .get(request.actor)
                        .map(|actor| actor.name().to_string())
                        .unwrap_or_default();
                    (request.continuation)(self, &name);
                }
                PendingPoll::Waiting => {
                    self.pending_ownership
                        .push(request.actor, request.deadline, request.continuation);
                }
                PendingPoll::Abandoned => {
                    debug!("Abandoning ownership continuation for {:?}", request.actor);
                }
            }
        }
    }

    /// Forgets transfer requests that went unanswered for longer than the
    /// request timeout
    pub(crate) fn expire_transfer_requests(&mut self) {
        let now = self.clock;
        let timeout = self.config.ownership.request_timeout;
        for actor in self.registry.iter_mut() {
            if let Some(since) = actor.transfer_requested_at {
                if now.saturating_sub(since) >= timeout {
                    actor.transfer_requested_at = None;
                }
            }
        }
    }

    // Private

    fn poll_pending(&self, handle: ActorHandle, deadline: Duration) -> PendingPoll {
        let Some(actor) = self.registry.get(handle) else {
            return PendingPoll::Abandoned;
        };
        if actor.is_locally_owned() {
            PendingPoll::Ready
        } else if self.clock >= deadline || self.locking_peer(handle, 0).is_some() {
            PendingPoll::Abandoned
        } else {
            PendingPoll::Waiting
        }
    }

    fn owned_handle(&self, name: &str) -> Result<ActorHandle, RegistryError> {
        let actor = self
            .registry
            .actor(name)
            .ok_or_else(|| RegistryError::UnknownName {
                name: name.to_string(),
            })?;
        if !actor.is_locally_owned() {
            return Err(RegistryError::NotLocallyOwned {
                name: name.to_string(),
            });
        }
        Ok(actor.handle())
    }

    fn lock_handle(&self, name: &str) -> Result<ActorHandle, LockError> {
        self.registry
            .get_by_name(name)
            .ok_or_else(|| LockError::UnknownActor {
                actor: name.to_string(),
            })
    }

    /// The lock flag travels with the owner's state sync
    fn mark_lock_changed(&mut self, handle: ActorHandle) {
        if let Some(actor) = self.registry.get_mut(handle) {
            if actor.is_locally_owned() {
                actor.state_dirty = true;
            }
        }
    }
}
