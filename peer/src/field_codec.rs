use std::collections::HashMap;

use log::warn;

use troupe_shared::{
    field_spec, Color, FieldError, FieldHook, FieldId, FieldSpec, Quat, SlotIndex, Value,
    ValueKind, Vec3,
};

use crate::{
    actor::{Actor, ActorHandle},
    hierarchy::{self, ParentLink},
    registry::ActorRegistry,
};

/// A write accepted during the script call. Writes are applied in order once
/// the call returns successfully.
#[derive(Clone, Debug, PartialEq)]
pub struct StagedWrite {
    pub actor: ActorHandle,
    pub field: FieldId,
    pub value: Value,
}

/// Field access handed to the scripting runtime for the duration of one
/// tick. Actors are addressed by their slot in this tick's snapshot.
///
/// Failed lookups never cross the boundary as errors: the plain getters log
/// and return the kind's zero value, the plain setters log and do nothing.
/// The `try_` variants report the [`FieldError`] instead.
pub struct FieldCodec<'w> {
    registry: &'w ActorRegistry,
    slots: &'w [ActorHandle],
    max_hierarchy_depth: usize,
    staged: Vec<StagedWrite>,
    latest: HashMap<(ActorHandle, FieldId), usize>,
}

macro_rules! codec_access {
    ($get:ident, $try_get:ident, $set:ident, $try_set:ident, $kind:ident, $ty:ty, $zero:expr) => {
        pub fn $try_get(&self, slot: SlotIndex, field: FieldId) -> Result<$ty, FieldError> {
            let actor = self.resolve(slot)?;
            let spec = expect_kind(field, ValueKind::$kind)?;
            if let Some(Value::$kind(value)) = self.staged_value(actor.handle(), spec.id) {
                return Ok(*value);
            }
            actor.fields.$get(field)
        }

        pub fn $get(&self, slot: SlotIndex, field: FieldId) -> $ty {
            self.$try_get(slot, field).unwrap_or_else(|error| {
                warn!("Field read failed: {}", error);
                $zero
            })
        }

        pub fn $try_set(
            &mut self,
            slot: SlotIndex,
            field: FieldId,
            value: $ty,
        ) -> Result<(), FieldError> {
            self.stage(slot, field, Value::$kind(value))
        }

        pub fn $set(&mut self, slot: SlotIndex, field: FieldId, value: $ty) {
            if let Err(error) = self.$try_set(slot, field, value) {
                warn!("Field write ignored: {}", error);
            }
        }
    };
}

impl<'w> FieldCodec<'w> {
    pub fn new(
        registry: &'w ActorRegistry,
        slots: &'w [ActorHandle],
        max_hierarchy_depth: usize,
    ) -> Self {
        Self {
            registry,
            slots,
            max_hierarchy_depth,
            staged: Vec::new(),
            latest: HashMap::new(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn actor_name(&self, slot: SlotIndex) -> Option<&'w str> {
        self.resolve(slot).ok().map(Actor::name)
    }

    /// Number of accepted writes waiting to be applied
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    pub fn into_staged(self) -> Vec<StagedWrite> {
        self.staged
    }

    codec_access!(get_bool, try_get_bool, set_bool, try_set_bool, Bool, bool, false);
    codec_access!(get_float, try_get_float, set_float, try_set_float, Float, f32, 0.0);
    codec_access!(get_vec3, try_get_vec3, set_vec3, try_set_vec3, Vec3, Vec3, Vec3::ZERO);
    codec_access!(get_quat, try_get_quat, set_quat, try_set_quat, Quat, Quat, Quat::IDENTITY);
    codec_access!(get_color, try_get_color, set_color, try_set_color, Color, Color, Color::CLEAR);

    pub fn try_get_string(&self, slot: SlotIndex, field: FieldId) -> Result<&str, FieldError> {
        let actor = self.resolve(slot)?;
        let spec = expect_kind(field, ValueKind::Str)?;
        if let Some(Value::Str(value)) = self.staged_value(actor.handle(), spec.id) {
            return Ok(value.as_str());
        }
        actor.fields.get_string(field)
    }

    pub fn get_string(&self, slot: SlotIndex, field: FieldId) -> &str {
        self.try_get_string(slot, field).unwrap_or_else(|error| {
            warn!("Field read failed: {}", error);
            ""
        })
    }

    pub fn try_set_string(
        &mut self,
        slot: SlotIndex,
        field: FieldId,
        value: &str,
    ) -> Result<(), FieldError> {
        self.stage(slot, field, Value::Str(value.to_string()))
    }

    pub fn set_string(&mut self, slot: SlotIndex, field: FieldId, value: &str) {
        if let Err(error) = self.try_set_string(slot, field, value) {
            warn!("Field write ignored: {}", error);
        }
    }

    /// Kind-agnostic read
    pub fn try_get_field(&self, slot: SlotIndex, field: FieldId) -> Result<Value, FieldError> {
        let actor = self.resolve(slot)?;
        spec_of(field)?;
        self.current_value(actor, field)
    }

    /// Kind-agnostic read. Unknown fields read as `false`.
    pub fn get_field(&self, slot: SlotIndex, field: FieldId) -> Value {
        self.try_get_field(slot, field).unwrap_or_else(|error| {
            warn!("Field read failed: {}", error);
            let kind = field_spec(field).map_or(ValueKind::Bool, |spec| spec.kind);
            Value::zero(kind)
        })
    }

    pub fn try_set_field(
        &mut self,
        slot: SlotIndex,
        field: FieldId,
        value: Value,
    ) -> Result<(), FieldError> {
        self.stage(slot, field, value)
    }

    pub fn set_field(&mut self, slot: SlotIndex, field: FieldId, value: Value) {
        if let Err(error) = self.try_set_field(slot, field, value) {
            warn!("Field write ignored: {}", error);
        }
    }

    // Private

    fn resolve(&self, slot: SlotIndex) -> Result<&'w Actor, FieldError> {
        let handle = self
            .slots
            .get(usize::from(slot))
            .ok_or(FieldError::SlotOutOfRange {
                slot,
                slot_count: self.slots.len(),
            })?;
        self.registry
            .get(*handle)
            .ok_or(FieldError::StaleSlot { slot })
    }

    fn staged_value(&self, actor: ActorHandle, field: FieldId) -> Option<&Value> {
        self.latest
            .get(&(actor, field))
            .and_then(|index| self.staged.get(*index))
            .map(|write| &write.value)
    }

    fn current_value(&self, actor: &Actor, field: FieldId) -> Result<Value, FieldError> {
        match self.staged_value(actor.handle(), field) {
            Some(value) => Ok(value.clone()),
            None => actor.fields.get(field),
        }
    }

    /// Parent name along `field` as the script currently sees it
    fn parent_in_view(&self, name: &str, field: FieldId) -> Option<&str> {
        let handle = self.registry.get_by_name(name)?;
        if let Some(Value::Str(parent)) = self.staged_value(handle, field) {
            return Some(parent.as_str());
        }
        self.registry
            .get(handle)
            .map(|actor| actor.fields.get_string(field).unwrap_or_default())
    }

    fn stage(&mut self, slot: SlotIndex, field: FieldId, value: Value) -> Result<(), FieldError> {
        let actor = self.resolve(slot)?;
        let spec = expect_kind(field, value.kind())?;
        if !value.is_finite() {
            return Err(FieldError::NonFinite { field: spec.name });
        }
        if !actor.is_locally_owned() {
            return Err(FieldError::NotLocallyOwned {
                actor: actor.name().to_string(),
                field: spec.name,
            });
        }

        if let (Some(link), Value::Str(parent)) = (ParentLink::from_hook(spec.hook), &value) {
            let link_field = link.field();
            hierarchy::check_reparent(
                actor.name(),
                parent,
                self.max_hierarchy_depth,
                |name: &str| self.parent_in_view(name, link_field),
            )
            .map_err(|violation| FieldError::ReparentRejected {
                actor: actor.name().to_string(),
                parent: parent.clone(),
                reason: violation.reason(),
            })?;
        }

        if self.current_value(actor, field)? == value {
            return Ok(());
        }

        let handle = actor.handle();
        self.latest.insert((handle, field), self.staged.len());
        self.staged.push(StagedWrite {
            actor: handle,
            field,
            value,
        });
        Ok(())
    }
}

fn spec_of(field: FieldId) -> Result<&'static FieldSpec, FieldError> {
    field_spec(field).ok_or(FieldError::UnknownField { field_id: field })
}

fn expect_kind(field: FieldId, actual: ValueKind) -> Result<&'static FieldSpec, FieldError> {
    let spec = spec_of(field)?;
    if spec.kind != actual {
        return Err(FieldError::KindMismatch {
            field: spec.name,
            expected: spec.kind,
            actual,
        });
    }
    Ok(spec)
}

/// Applies one accepted write. Returns the field's hook when the stored
/// value changed and the field has one.
pub(crate) fn apply_write(
    registry: &mut ActorRegistry,
    write: StagedWrite,
) -> Result<Option<FieldHook>, FieldError> {
    let spec = spec_of(write.field)?;
    let Some(actor) = registry.get_mut(write.actor) else {
        return Ok(None);
    };
    if !actor.fields.set(write.field, write.value)? {
        return Ok(None);
    }

    actor.state_dirty = true;
    match spec.hook {
        FieldHook::None => Ok(None),
        hook => {
            if matches!(hook, FieldHook::Reparent | FieldHook::Offstage) {
                actor.needs_script_sync = true;
            }
            Ok(Some(hook))
        }
    }
}
