use std::{collections::HashMap, mem, time::Duration};

use log::{debug, error, warn};

use troupe_shared::{ActorMessage, Rpc, SlotIndex, Transform};

use crate::{
    actor::ActorHandle,
    error::EngineError,
    events::WorldEvent,
    field_codec::{apply_write, FieldCodec, StagedWrite},
    physics::PhysicsSink,
    replication::{group_by_destination, MessageRoute},
    script::{ActorRuntimeState, ScriptBoundary, SpawnRequest, TickRequest, TickResponse, TouchEvent},
    world::World,
};

/// Message a script sends to the host to reset the game everywhere
const RESET_MESSAGE: &str = "ResetTriggeredByHandler";

/// Where the world is inside one script tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    Serializing,
    AwaitingScriptResponse,
    ApplyingResponse,
}

/// What one call to [`World::tick`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The script ran
    Stepped,
    /// The world is stopped; only the network was pumped
    Paused,
}

impl World {
    /// Advances the world by `dt`. Pumps the network, runs the script when
    /// the world is running or a single step is queued, then replicates.
    ///
    /// A failing script call halts the world: the error is returned once and
    /// every later call returns [`EngineError::Halted`].
    pub fn tick(
        &mut self,
        dt: Duration,
        script: &mut dyn ScriptBoundary,
        physics: &mut dyn PhysicsSink,
    ) -> Result<TickOutcome, EngineError> {
        if self.halted {
            return Err(EngineError::Halted);
        }
        self.clock += dt;

        self.sync_peer_list(script);
        self.receive(script)?;
        self.expire_transfer_requests();
        let expired = self.waitlist.expire(self.clock);
        if expired > 0 {
            debug!("Dropped {} waitlisted calls", expired);
        }
        self.poll_pending_ownership();

        let outcome = if self.running || mem::take(&mut self.single_step_queued) {
            self.step(dt, script, physics)?;
            TickOutcome::Stepped
        } else {
            TickOutcome::Paused
        };

        self.apply_queued_destroys();
        self.replicate_dirty_state();
        self.drain_memory_sync(script);
        self.replication.flush(self.clock);

        Ok(outcome)
    }

    // Private

    fn step(
        &mut self,
        dt: Duration,
        script: &mut dyn ScriptBoundary,
        physics: &mut dyn PhysicsSink,
    ) -> Result<(), EngineError> {
        self.phase = TickPhase::Serializing;
        let slots = self.registry.snapshot_ordered();
        let request = self.build_request(dt, &slots);

        self.phase = TickPhase::AwaitingScriptResponse;
        let result = {
            let mut codec = FieldCodec::new(&self.registry, &slots, self.config.max_hierarchy_depth);
            script
                .tick(&request, &mut codec)
                .map(|response| (response, codec.into_staged()))
        };

        let (response, writes) = match result {
            Ok(result) => result,
            Err(source) => {
                error!("Script tick {} failed, halting: {}", request.tick, source);
                self.halted = true;
                self.phase = TickPhase::Idle;
                return Err(EngineError::ScriptBoundary {
                    tick: request.tick,
                    source,
                });
            }
        };

        self.phase = TickPhase::ApplyingResponse;
        self.apply_writes(writes);
        self.apply_response(response, &slots, physics);

        self.phase = TickPhase::Idle;
        self.tick_count += 1;
        Ok(())
    }

    fn build_request(&mut self, dt: Duration, slots: &[ActorHandle]) -> TickRequest {
        let max_depth = self.config.max_hierarchy_depth;
        let mut slot_of: HashMap<ActorHandle, SlotIndex> = HashMap::with_capacity(slots.len());
        let mut actor_names = Vec::with_capacity(slots.len());
        let mut snapshot = Vec::new();
        let mut synced = Vec::new();

        for (index, handle) in slots.iter().enumerate() {
            let Ok(slot) = SlotIndex::try_from(index) else {
                warn!("More actors than script slots; the rest are not scripted");
                break;
            };
            let Some(actor) = self.registry.get(*handle) else {
                continue;
            };
            slot_of.insert(*handle, slot);
            actor_names.push(actor.name().to_string());

            if !actor.fields.is_player_controllable && !actor.needs_script_sync {
                continue;
            }
            let is_offstage = self
                .registry
                .root_of(actor.name(), max_depth)
                .and_then(|root| self.registry.get(root))
                .map_or(actor.fields.prefer_offstage, |root| root.fields.prefer_offstage);
            snapshot.push(ActorRuntimeState {
                slot,
                name: actor.name().to_string(),
                brain_name: actor.fields.brain_name.clone(),
                is_locally_owned: actor.is_locally_owned(),
                is_player_controllable: actor.fields.is_player_controllable,
                is_offstage,
                position: actor.fields.position,
                rotation: actor.fields.rotation,
                velocity: actor.fields.velocity,
                memory_json: actor
                    .memory_received
                    .then(|| actor.memory_json.clone()),
            });
            synced.push(*handle);
        }

        for handle in synced {
            if let Some(actor) = self.registry.get_mut(handle) {
                actor.needs_script_sync = false;
                actor.memory_received = false;
            }
        }

        let queued_touch_events = mem::take(&mut self.touch_events)
            .into_iter()
            .filter_map(|touch| {
                Some(TouchEvent {
                    receiver: *slot_of.get(&touch.receiver)?,
                    other: touch.other.and_then(|other| slot_of.get(&other).copied()),
                    is_enter: touch.is_enter,
                })
            })
            .collect();

        TickRequest {
            tick: self.tick_count,
            delta_seconds: dt.as_secs_f32(),
            actor_names,
            snapshot,
            inbound_messages: mem::take(&mut self.inbound_messages),
            queued_touch_events,
        }
    }

    fn apply_writes(&mut self, writes: Vec<StagedWrite>) {
        for write in writes {
            let actor = write.actor;
            match apply_write(&mut self.registry, write) {
                Ok(Some(hook)) => self.push_derived_state_event(actor, hook),
                Ok(None) => {}
                Err(error) => warn!("Dropping staged write: {}", error),
            }
        }
    }

    fn apply_response(
        &mut self,
        response: TickResponse,
        slots: &[ActorHandle],
        physics: &mut dyn PhysicsSink,
    ) {
        let owned_slot = |world: &World, slot: SlotIndex| -> Option<ActorHandle> {
            let handle = *slots.get(usize::from(slot))?;
            world
                .registry
                .get(handle)
                .filter(|actor| actor.is_locally_owned())
                .map(|actor| actor.handle())
        };

        for slot in response.memory_dirty_actor_ids {
            let Some(handle) = owned_slot(self, slot) else {
                continue;
            };
            if let Some(actor) = self.registry.get_mut(handle) {
                actor.memory_dirty = true;
            }
            self.memory_sync.enqueue(handle);
        }

        for change in response.velocity_changes {
            if let Some(actor) = owned_slot(self, change.slot).and_then(|h| self.registry.get(h)) {
                physics.add_velocity(actor.name(), change.delta);
            }
        }
        for request in response.torque_requests {
            if let Some(actor) = owned_slot(self, request.slot).and_then(|h| self.registry.get(h)) {
                physics.add_torque(actor.name(), request.torque);
            }
        }

        self.route_remote_messages(response.outbound_messages_to_remote);
        for message in response.outbound_messages_to_host {
            self.handle_host_message(message);
        }

        for spawn in response.spawn_requests {
            self.spawn(spawn);
        }

        for slot in response.destroy_requests {
            let Some(handle) = slots.get(usize::from(slot)).copied() else {
                continue;
            };
            if self.registry.get(handle).is_some() && !self.actors_to_destroy.contains(&handle) {
                self.actors_to_destroy.push(handle);
            }
        }
    }

    fn route_remote_messages(&mut self, messages: Vec<ActorMessage>) {
        if messages.is_empty() {
            return;
        }
        let registry = &self.registry;
        let (local, groups) = group_by_destination(messages, |target: &str| {
            match registry.actor(target) {
                None => MessageRoute::Missing,
                Some(actor) if actor.is_locally_owned() => MessageRoute::Local,
                Some(actor) => MessageRoute::Remote {
                    owner: actor.owning_peer(),
                    handle: actor.replication_handle(),
                },
            }
        });

        self.inbound_messages.extend(local);
        for group in groups {
            let rpc = Rpc::DeliverMessages {
                messages: group.messages,
            };
            match group.destination {
                None => self.replication.broadcast(rpc),
                Some(peer) => self.replication.send_to(peer, rpc),
            }
        }
    }

    fn handle_host_message(&mut self, message: ActorMessage) {
        match message.target_actor.as_deref().filter(|target| !target.is_empty()) {
            Some(target) => {
                if self.registry.get_by_name(target).is_some() {
                    self.events.push(WorldEvent::HostMessage(message));
                } else {
                    warn!("Host message {} for unknown actor {}", message.name, target);
                }
            }
            None if message.name == RESET_MESSAGE => self.reset_game(),
            None => error!("Unknown host message {}", message.name),
        }
    }

    fn spawn(&mut self, request: SpawnRequest) {
        let transform = Transform::new(request.position, request.rotation);
        let Some(source) = request.clone_of else {
            let handle = self.registry.create(transform);
            self.announce_created(handle);
            return;
        };

        let Some(original) = self.registry.actor(&source) else {
            warn!("Cannot clone unknown actor {}", source);
            return;
        };
        let mut fields = original.fields.clone();
        let tags = original.tags.clone();
        if fields.clone_parent.is_empty() {
            fields.clone_parent = original.name().to_string();
        }
        fields.was_cloned_by_script = true;
        fields.position = transform.position;
        fields.rotation = transform.rotation;
        fields.spawn_position = transform.position;
        fields.spawn_rotation = transform.rotation;

        let handle = self.registry.create(transform);
        if let Some(clone) = self.registry.get_mut(handle) {
            clone.fields = fields;
            clone.tags = tags;
        }
        self.announce_created(handle);
    }

    fn apply_queued_destroys(&mut self) {
        for handle in mem::take(&mut self.actors_to_destroy) {
            self.destroy_actor_by_handle(handle);
        }
        for handle in mem::take(&mut self.actors_to_destroy_local) {
            self.destroy_local_only(handle);
        }
    }

    fn replicate_dirty_state(&mut self) {
        let dirty: Vec<ActorHandle> = self
            .registry
            .iter()
            .filter(|actor| actor.is_locally_owned() && actor.state_dirty)
            .map(|actor| actor.handle())
            .collect();
        for handle in dirty {
            self.replicate_state_of(handle);
        }
    }

    fn drain_memory_sync(&mut self, script: &mut dyn ScriptBoundary) {
        let registry = &self.registry;
        let next = self.memory_sync.next_due(self.clock, |handle| {
            registry
                .get(handle)
                .map_or(false, |actor| actor.is_locally_owned() && actor.memory_dirty)
        });
        if let Some(handle) = next {
            self.refresh_memory(handle, script);
            self.send_memory(handle);
        }
    }
}
