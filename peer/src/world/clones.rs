use log::{debug, warn};

use troupe_shared::{field, ActorFields, FieldId, FIELD_TABLE};

use crate::world::World;

/// Fields that stay per-copy when properties are pushed to clones
const PER_COPY_FIELDS: &[FieldId] = &[
    field::LOCAL_SCALE,
    field::CLONE_PARENT,
    field::DISPLAY_NAME,
    field::POSITION,
    field::ROTATION,
    field::TRANSFORM_PARENT,
    field::SPAWN_POSITION,
    field::SPAWN_ROTATION,
    field::SPAWN_TRANSFORM_PARENT,
    field::PREFER_OFFSTAGE,
    field::WAS_CLONED_BY_SCRIPT,
];

impl World {
    /// Names of every other member of the actor's clone group: the original
    /// and all of its copies
    pub fn enumerate_copies_of(&self, name: &str) -> Vec<String> {
        let Some(handle) = self.registry.get_by_name(name) else {
            return Vec::new();
        };
        self.registry
            .copies_of(handle)
            .into_iter()
            .filter_map(|copy| self.registry.get(copy).map(|actor| actor.name().to_string()))
            .collect()
    }

    /// Copies the shared properties and tags of `name` onto every copy not
    /// locked by another peer, taking ownership of each copy first
    pub fn apply_properties_to_clones(&mut self, name: &str) {
        let Some(source) = self.registry.actor(name) else {
            return;
        };
        let fields = source.fields.clone();
        let tags = source.tags.clone();

        for copy in self.enumerate_copies_of(name) {
            if self.is_locked_by_another(&copy) {
                debug!("Not updating clone {}: locked by another peer", copy);
                continue;
            }
            let fields = fields.clone();
            let tags = tags.clone();
            self.request_ownership_then(&copy, move |world: &mut World, copy: &str| {
                let Some(actor) = world.registry.actor_mut(copy) else {
                    return;
                };
                copy_shared_fields(&fields, &mut actor.fields);
                actor.tags = tags;
                actor.state_dirty = true;
                actor.needs_script_sync = true;
            });
        }
    }

    /// Gives every copy of `name` the same brain
    pub fn apply_brain_name_to_clones(&mut self, name: &str) {
        let Some(source) = self.registry.actor(name) else {
            return;
        };
        let brain_name = source.fields.brain_name.clone();

        for copy in self.enumerate_copies_of(name) {
            if self.is_locked_by_another(&copy) {
                continue;
            }
            let brain_name = brain_name.clone();
            self.request_ownership_then(&copy, move |world: &mut World, copy: &str| {
                let Some(actor) = world.registry.actor_mut(copy) else {
                    return;
                };
                if actor.fields.brain_name != brain_name {
                    actor.fields.brain_name = brain_name;
                    actor.state_dirty = true;
                    actor.needs_script_sync = true;
                }
            });
        }
    }
}

fn copy_shared_fields(source: &ActorFields, target: &mut ActorFields) {
    for spec in FIELD_TABLE {
        if PER_COPY_FIELDS.contains(&spec.id) {
            continue;
        }
        let copied = source
            .get(spec.id)
            .and_then(|value| target.set(spec.id, value));
        if let Err(error) = copied {
            warn!("Not copying {}: {}", spec.name, error);
        }
    }
}
