use log::{debug, info, warn};

use troupe_shared::{
    ActorMessage, FieldHook, OwnRequestReason, PeerId, PersistedRecord, RemoteMessage,
    ReplicationHandle, Rpc, FIELD_TABLE,
};

use crate::{
    actor::ActorHandle,
    error::EngineError,
    events::WorldEvent,
    ownership::{evaluate_transfer_request, shareable_record, TransferContext},
    script::ScriptBoundary,
    world::World,
};

impl World {
    /// Pumps the transport and applies every call that became deliverable.
    /// Returns how many calls were handled.
    pub fn receive(&mut self, script: &mut dyn ScriptBoundary) -> Result<usize, EngineError> {
        let delivered = self.replication.receive()?;
        let count = delivered.len();
        for (sender, rpc) in delivered {
            self.handle_rpc(sender, rpc, script);
        }
        Ok(count)
    }

    // Crate-public

    /// Picks up joined and departed peers. Joiners get a replica of every
    /// actor owned here and, if the simulation runs, the running state.
    pub(crate) fn sync_peer_list(&mut self, script: &mut dyn ScriptBoundary) {
        let changes = self.replication.refresh_peers();
        for peer in changes.joined {
            info!("Peer {} joined; sending our actors", peer);
            let owned: Vec<ActorHandle> = self
                .registry
                .iter()
                .filter(|actor| actor.is_locally_owned())
                .map(|actor| actor.handle())
                .collect();
            for handle in owned {
                self.refresh_memory(handle, script);
                let Some(actor) = self.registry.get(handle) else {
                    continue;
                };
                let rpc = self.create_replica_rpc(actor);
                self.replication.send_to(peer, rpc);
            }
            if self.running {
                self.replication
                    .send_to(peer, Rpc::SetRunning { running: true });
            }
        }
        for peer in changes.left {
            info!("Peer {} left", peer);
        }
    }

    /// Pulls the freshest memory of an owned actor out of the script runtime
    pub(crate) fn refresh_memory(&mut self, handle: ActorHandle, script: &mut dyn ScriptBoundary) {
        let Some(actor) = self.registry.get(handle) else {
            return;
        };
        if let Some(memory_json) = script.read_memory(actor.name()) {
            if let Some(actor) = self.registry.get_mut(handle) {
                actor.memory_json = memory_json;
            }
        }
    }

    /// Broadcasts the memory blob outside the rate limit
    pub(crate) fn send_memory(&mut self, handle: ActorHandle) {
        let Some(actor) = self.registry.get_mut(handle) else {
            return;
        };
        actor.memory_dirty = false;
        let memory_json = actor.memory_json.clone();
        let replication_handle = actor.replication_handle();
        let epoch = actor.epoch;

        self.memory_sync.remove(handle);
        self.memory_sync.record_sent(self.clock, memory_json.len());
        self.replication.broadcast(Rpc::SyncMemory {
            handle: replication_handle,
            epoch,
            memory_json,
        });
    }

    /// Broadcasts the fields of an owned actor if any changed
    pub(crate) fn replicate_state_of(&mut self, handle: ActorHandle) {
        let lock_wanted = self.locks.is_wanted(handle);
        let Some(actor) = self.registry.get_mut(handle) else {
            return;
        };
        if !actor.is_locally_owned() || !actor.state_dirty {
            return;
        }
        actor.state_dirty = false;
        let rpc = Rpc::SyncState {
            handle: actor.replication_handle(),
            epoch: actor.epoch,
            lock_wanted,
            record: shareable_record(actor.save_state()),
        };
        self.replication.broadcast(rpc);
    }

    // Private

    fn handle_rpc(&mut self, sender: PeerId, rpc: Rpc, script: &mut dyn ScriptBoundary) {
        if !self.initialized {
            info!("Dropping {} from {}: world not initialized", rpc.name(), sender);
            return;
        }

        let rpc = match rpc {
            Rpc::CreateReplica {
                handle,
                owner,
                epoch,
                lock_wanted,
                record,
            } => {
                self.on_create_replica(handle, owner, epoch, lock_wanted, record);
                for (sender, rpc) in self.waitlist.release(&handle) {
                    self.handle_rpc(sender, rpc, script);
                }
                return;
            }
            rpc => rpc,
        };

        if let Some(replication_handle) = rpc.handle() {
            match self.registry.get_by_replication(&replication_handle) {
                Some(actor) => self.handle_actor_rpc(sender, actor, rpc, script),
                None => self.on_unknown_handle(sender, replication_handle, rpc),
            }
            return;
        }

        match rpc {
            Rpc::DeliverMessages { messages } => self.on_deliver_messages(messages),
            Rpc::SetRunning { running } => self.apply_running(running),
            Rpc::ResetGame => self.apply_reset(),
            other => debug!("Ignoring {} from {}", other.name(), sender),
        }
    }

    fn handle_actor_rpc(
        &mut self,
        sender: PeerId,
        handle: ActorHandle,
        rpc: Rpc,
        script: &mut dyn ScriptBoundary,
    ) {
        match rpc {
            Rpc::DestroyReplica { .. } => self.on_destroy_replica(sender, handle),
            Rpc::RequestDestroy { .. } => self.on_request_destroy(handle),
            Rpc::RequestOwnershipTransfer { reason, .. } => {
                self.on_transfer_request(sender, handle, reason, script)
            }
            Rpc::TransferOwnership {
                new_owner, epoch, ..
            } => self.on_transfer_ownership(handle, new_owner, epoch),
            Rpc::SyncState {
                epoch,
                lock_wanted,
                record,
                ..
            } => self.on_sync_state(sender, handle, epoch, lock_wanted, record),
            Rpc::SyncMemory {
                epoch, memory_json, ..
            } => self.on_sync_memory(sender, handle, epoch, memory_json),
            other => debug!("Ignoring {} from {}", other.name(), sender),
        }
    }

    fn on_unknown_handle(&mut self, sender: PeerId, handle: ReplicationHandle, rpc: Rpc) {
        if self.registry.is_retired_handle(&handle) {
            debug!("Ignoring {} for destroyed actor {}", rpc.name(), handle);
        } else if handle.creator() == self.local_peer {
            debug!("Ignoring {} for unknown local actor {}", rpc.name(), handle);
        } else {
            debug!("Holding {} until actor {} is created", rpc.name(), handle);
            self.waitlist.queue(handle, self.clock, sender, rpc);
        }
    }

    fn on_create_replica(
        &mut self,
        handle: ReplicationHandle,
        owner: PeerId,
        epoch: u32,
        lock_wanted: bool,
        record: PersistedRecord,
    ) {
        if let Some(existing) = self.registry.get_by_replication(&handle) {
            self.on_repeated_create(existing, owner, epoch, lock_wanted, record);
            return;
        }
        if self.registry.is_retired_handle(&handle) {
            debug!("Ignoring creation of destroyed actor {}", handle);
            return;
        }
        match self
            .registry
            .create_replica(handle, owner, epoch, lock_wanted, record)
        {
            Ok(actor) => {
                self.registry
                    .clear_invalid_parents(actor, self.config.max_hierarchy_depth);
                if let Some(actor) = self.registry.get(actor) {
                    debug!("Created replica {} of actor {}", actor.name(), handle);
                    self.events.push(WorldEvent::ActorSpawned {
                        name: actor.name().to_string(),
                        is_replica: true,
                    });
                }
            }
            Err(error) => warn!("Could not create replica {}: {}", handle, error),
        }
    }

    /// A creation for an actor we already have. Only a newer epoch carries
    /// anything new: the owner changed hands while the notice was elsewhere.
    fn on_repeated_create(
        &mut self,
        handle: ActorHandle,
        owner: PeerId,
        epoch: u32,
        lock_wanted: bool,
        record: PersistedRecord,
    ) {
        let Some(actor) = self.registry.get(handle) else {
            return;
        };
        if epoch <= actor.epoch {
            debug!("Ignoring repeated creation of {}", actor.name());
            return;
        }
        self.on_transfer_ownership(handle, owner, epoch);
        if owner == self.local_peer {
            return;
        }
        let has_memory = !record.memory_json.is_empty();
        self.apply_owner_state(handle, lock_wanted, record);
        if let Some(actor) = self.registry.get_mut(handle) {
            actor.memory_received |= has_memory;
        }
    }

    fn on_destroy_replica(&mut self, sender: PeerId, handle: ActorHandle) {
        let Some(actor) = self.registry.get(handle) else {
            return;
        };
        if actor.owning_peer() != sender {
            warn!(
                "Ignoring destroy of {} from {}, which does not own it",
                actor.name(),
                sender
            );
            return;
        }
        if !self.actors_to_destroy_local.contains(&handle) {
            self.actors_to_destroy_local.push(handle);
        }
    }

    fn on_request_destroy(&mut self, handle: ActorHandle) {
        let Some(actor) = self.registry.get(handle) else {
            return;
        };
        if !actor.is_locally_owned() {
            debug!("Ignoring destroy request for {}: not ours", actor.name());
            return;
        }
        if !self.actors_to_destroy.contains(&handle) {
            self.actors_to_destroy.push(handle);
        }
    }

    fn on_transfer_request(
        &mut self,
        requester: PeerId,
        handle: ActorHandle,
        reason: OwnRequestReason,
        script: &mut dyn ScriptBoundary,
    ) {
        let Some(actor) = self.registry.get(handle) else {
            return;
        };
        if !actor.is_locally_owned() {
            debug!(
                "Ignoring transfer request for {} from {}: not ours",
                actor.name(),
                requester
            );
            return;
        }

        let context = TransferContext {
            actor,
            reason,
            want_count: self.locks.want_count(handle),
            is_local_surrogate: self.is_local_surrogate(handle),
            now: self.clock,
            collision_cooldown: self.config.ownership.collision_cooldown,
        };
        if let Err(denial) = evaluate_transfer_request(&context) {
            debug!(
                "Refusing {} ownership of {}: {}",
                requester,
                actor.name(),
                denial
            );
            return;
        }

        self.grant_ownership(handle, requester, script);
    }

    /// Hands a locally owned actor to `new_owner`. Dirty state and memory go
    /// out on the same channels ahead of the transfer.
    fn grant_ownership(
        &mut self,
        handle: ActorHandle,
        new_owner: PeerId,
        script: &mut dyn ScriptBoundary,
    ) {
        self.replicate_state_of(handle);

        let memory_dirty = self
            .registry
            .get(handle)
            .map_or(false, |actor| actor.memory_dirty);
        if memory_dirty {
            self.refresh_memory(handle, script);
            self.send_memory(handle);
        }

        let now = self.clock;
        let Some(actor) = self.registry.get_mut(handle) else {
            return;
        };
        let epoch = actor.epoch.wrapping_add(1);
        actor.set_owner(new_owner, epoch, now);
        actor.lock_wanted_by_owner = false;
        let name = actor.name().to_string();
        let replication_handle = actor.replication_handle();

        info!("Granted {} ownership of {}", new_owner, name);
        self.replication.broadcast(Rpc::TransferOwnership {
            handle: replication_handle,
            new_owner,
            epoch,
        });
        self.events
            .push(WorldEvent::OwnershipLost { name, new_owner });
    }

    fn on_transfer_ownership(&mut self, handle: ActorHandle, new_owner: PeerId, epoch: u32) {
        let now = self.clock;
        let local_peer = self.local_peer;
        let Some(actor) = self.registry.get_mut(handle) else {
            return;
        };
        if epoch <= actor.epoch {
            debug!(
                "Ignoring stale transfer of {} (epoch {} <= {})",
                actor.name(),
                epoch,
                actor.epoch
            );
            return;
        }

        let was_local = actor.is_locally_owned();
        actor.set_owner(new_owner, epoch, now);
        if new_owner != local_peer {
            if was_local {
                let name = actor.name().to_string();
                self.events
                    .push(WorldEvent::OwnershipLost { name, new_owner });
            }
            return;
        }

        actor.lock_wanted_by_owner = false;
        if self.locks.is_wanted(handle) {
            actor.state_dirty = true;
        }
        let name = actor.name().to_string();
        info!("Gained ownership of {}", name);
        self.events.push(WorldEvent::OwnershipGained { name });

        // Peers that joined while the actor was in flight heard about it
        // from nobody
        if let Some(actor) = self.registry.get(handle) {
            let rpc = self.create_replica_rpc(actor);
            self.replication.broadcast(rpc);
        }
    }

    /// Whether a call from `sender` carrying ownership `epoch` comes from the
    /// current owner. A newer epoch means the transfer notice is still on
    /// another channel, so the sender is taken as owner right away.
    fn accept_from_owner(&mut self, sender: PeerId, handle: ActorHandle, epoch: u32) -> bool {
        let Some(actor) = self.registry.get(handle) else {
            return false;
        };
        if epoch > actor.epoch && sender != self.local_peer {
            debug!(
                "Taking {} as owner of {} ahead of its transfer (epoch {} > {})",
                sender,
                actor.name(),
                epoch,
                actor.epoch
            );
            self.on_transfer_ownership(handle, sender, epoch);
            return true;
        }
        epoch == actor.epoch && !actor.is_locally_owned() && actor.owning_peer() == sender
    }

    fn on_sync_state(
        &mut self,
        sender: PeerId,
        handle: ActorHandle,
        epoch: u32,
        lock_wanted: bool,
        record: PersistedRecord,
    ) {
        if !self.accept_from_owner(sender, handle, epoch) {
            debug!("Ignoring state of {:?} from {} (epoch {})", handle, sender, epoch);
            return;
        }
        self.apply_owner_state(handle, lock_wanted, record);
    }

    /// Loads the owner's record into the replica, following renames and
    /// raising the hooks of changed fields
    fn apply_owner_state(&mut self, handle: ActorHandle, lock_wanted: bool, record: PersistedRecord) {
        let Some(actor) = self.registry.get(handle) else {
            return;
        };
        let old_name = actor.name().to_string();
        if !record.name.is_empty() && record.name != old_name {
            match self.registry.rename(handle, &record.name) {
                Ok(()) => self.events.push(WorldEvent::ActorRenamed {
                    old_name,
                    new_name: record.name.clone(),
                }),
                Err(error) => warn!("Could not follow rename of {}: {}", old_name, error),
            }
        }

        let Some(actor) = self.registry.get_mut(handle) else {
            return;
        };
        let previous = actor.fields.clone();
        actor.load(record);
        actor.lock_wanted_by_owner = lock_wanted;
        actor.state_dirty = false;
        self.registry
            .clear_invalid_parents(handle, self.config.max_hierarchy_depth);

        let Some(actor) = self.registry.get(handle) else {
            return;
        };
        let mut hooks: Vec<FieldHook> = Vec::new();
        for spec in FIELD_TABLE {
            if spec.hook == FieldHook::None || hooks.contains(&spec.hook) {
                continue;
            }
            if previous.field_ref(spec.id) != actor.fields.field_ref(spec.id) {
                hooks.push(spec.hook);
            }
        }
        for hook in hooks {
            self.push_derived_state_event(handle, hook);
        }
    }

    fn on_sync_memory(
        &mut self,
        sender: PeerId,
        handle: ActorHandle,
        epoch: u32,
        memory_json: String,
    ) {
        if !self.accept_from_owner(sender, handle, epoch) {
            debug!("Ignoring memory of {:?} from {} (epoch {})", handle, sender, epoch);
            return;
        }
        let Some(actor) = self.registry.get_mut(handle) else {
            return;
        };
        actor.memory_json = memory_json;
        actor.memory_received = true;
        actor.needs_script_sync = true;
    }

    fn on_deliver_messages(&mut self, messages: Vec<RemoteMessage>) {
        for message in messages {
            let target_actor = match message.target {
                None => None,
                Some(handle) => match self.registry.get_by_replication(&handle) {
                    Some(actor) => self
                        .registry
                        .get(actor)
                        .map(|actor| actor.name().to_string()),
                    None => {
                        debug!("Dropping message {} for unknown actor {}", message.name, handle);
                        continue;
                    }
                },
            };
            self.inbound_messages.push(ActorMessage {
                name: message.name,
                target_actor,
                args_json: message.args_json,
                from_remote: true,
            });
        }
    }
}
