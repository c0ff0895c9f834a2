use serde::{Deserialize, Serialize};
use troupe_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{
    actor::{
        error::FieldError,
        value::{FieldMut, FieldRef, Value, ValueKind},
    },
    math::{Color, Quat, Vec3},
    types::FieldId,
};

/// Derived state that must be recomputed when a field changes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldHook {
    None,
    Reparent,
    SpawnReparent,
    Offstage,
    Physics,
    Renderable,
}

/// One row of the field table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub id: FieldId,
    pub name: &'static str,
    pub kind: ValueKind,
    pub hook: FieldHook,
}

macro_rules! field_type {
    (Bool) => { bool };
    (Float) => { f32 };
    (Vec3) => { Vec3 };
    (Quat) => { Quat };
    (Str) => { String };
    (Color) => { Color };
}

/// Expands a field table into the `ActorFields` struct, its defaults, the
/// `field::*` ID constants, `FIELD_TABLE`, ID dispatch and both encodings.
/// IDs must be dense and listed in order.
macro_rules! actor_fields {
    (
        $( $id:literal $konst:ident $field:ident : $kind:ident = $default:expr, $name:literal, $hook:ident; )*
    ) => {
        /// Field ID constants, one per table row
        pub mod field {
            use crate::types::FieldId;

            $( pub const $konst: FieldId = $id; )*
        }

        pub static FIELD_TABLE: &[FieldSpec] = &[
            $( FieldSpec { id: $id, name: $name, kind: ValueKind::$kind, hook: FieldHook::$hook }, )*
        ];

        /// Every typed field of an actor. Missing keys in structured input
        /// take their defaults so older files still load.
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct ActorFields {
            $(
                #[serde(rename = $name)]
                pub $field: field_type!($kind),
            )*
        }

        impl Default for ActorFields {
            fn default() -> Self {
                Self {
                    $( $field: $default, )*
                }
            }
        }

        impl ActorFields {
            pub fn field_ref(&self, id: FieldId) -> Option<FieldRef<'_>> {
                match id {
                    $( $id => Some(FieldRef::$kind(&self.$field)), )*
                    _ => None,
                }
            }

            pub fn field_mut(&mut self, id: FieldId) -> Option<FieldMut<'_>> {
                match id {
                    $( $id => Some(FieldMut::$kind(&mut self.$field)), )*
                    _ => None,
                }
            }
        }

        impl Serde for ActorFields {
            fn ser(&self, writer: &mut dyn BitWrite) {
                $( self.$field.ser(writer); )*
            }

            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                Ok(Self {
                    $( $field: Serde::de(reader)?, )*
                })
            }
        }
    };
}

actor_fields! {
    0 DISPLAY_NAME display_name: Str = String::new(), "displayName", None;
    1 DESCRIPTION description: Str = String::new(), "description", None;
    2 TRANSFORM_PARENT transform_parent: Str = String::new(), "transformParent", Reparent;
    3 COMMENT_TEXT comment_text: Str = String::new(), "commentText", None;
    4 DEBUG_STRING debug_string: Str = String::new(), "debugString", None;
    5 CLONE_PARENT clone_parent: Str = String::new(), "cloneParent", None;
    6 SPAWN_TRANSFORM_PARENT spawn_transform_parent: Str = String::new(), "spawnTransformParent", SpawnReparent;
    7 LOOPING_ANIMATION looping_animation: Str = String::new(), "loopingAnimation", None;
    8 LIGHT_SETTINGS_JSON light_settings_json: Str = String::new(), "lightSettingsJson", None;
    9 CAMERA_SETTINGS_JSON camera_settings_json: Str = String::new(), "cameraSettingsJson", None;
    10 PFX_ID pfx_id: Str = String::new(), "pfxId", None;
    11 SFX_ID sfx_id: Str = String::new(), "sfxId", None;
    12 CAMERA_ACTOR camera_actor: Str = String::new(), "cameraActor", None;
    13 BRAIN_NAME brain_name: Str = String::new(), "brainName", None;
    14 RENDERABLE_URI renderable_uri: Str = String::new(), "renderableUri", Renderable;
    15 TINT tint: Color = Color::WHITE, "tint", Renderable;
    16 POSITION position: Vec3 = Vec3::ZERO, "position", None;
    17 LOCAL_SCALE local_scale: Vec3 = Vec3::ONE, "localScale", None;
    18 RENDERABLE_OFFSET renderable_offset: Vec3 = Vec3::ZERO, "renderableOffset", Renderable;
    19 SPAWN_POSITION spawn_position: Vec3 = Vec3::ZERO, "spawnPosition", None;
    20 VELOCITY velocity: Vec3 = Vec3::ZERO, "velocity", None;
    21 ANGULAR_VELOCITY angular_velocity: Vec3 = Vec3::ZERO, "angularVelocity", None;
    22 STICKY_DESIRED_VELOCITY sticky_desired_velocity: Vec3 = Vec3::ZERO, "stickyDesiredVelocity", None;
    23 STICKY_FORCE sticky_force: Vec3 = Vec3::ZERO, "stickyForce", None;
    24 ROTATION rotation: Quat = Quat::IDENTITY, "rotation", None;
    25 RENDERABLE_ROTATION renderable_rotation: Quat = Quat::IDENTITY, "renderableRotation", Renderable;
    26 SPAWN_ROTATION spawn_rotation: Quat = Quat::IDENTITY, "spawnRotation", None;
    27 BOUNCINESS bounciness: Float = 0.0, "bounciness", Physics;
    28 DRAG drag: Float = 0.0, "drag", Physics;
    29 ANGULAR_DRAG angular_drag: Float = 0.05, "angularDrag", Physics;
    30 MASS mass: Float = 1.0, "mass", Physics;
    31 PREFER_OFFSTAGE prefer_offstage: Bool = false, "preferOffstage", Offstage;
    32 IS_SOLID is_solid: Bool = true, "isSolid", Physics;
    33 ENABLE_PHYSICS enable_physics: Bool = false, "enablePhysics", Physics;
    34 ENABLE_GRAVITY enable_gravity: Bool = true, "enableGravity", Physics;
    35 FREEZE_ROTATIONS freeze_rotations: Bool = false, "freezeRotations", Physics;
    36 FREEZE_X freeze_x: Bool = false, "freezeX", Physics;
    37 FREEZE_Y freeze_y: Bool = false, "freezeY", Physics;
    38 FREEZE_Z freeze_z: Bool = false, "freezeZ", Physics;
    39 ENABLE_AIMING enable_aiming: Bool = false, "enableAiming", None;
    40 HIDE_IN_PLAY_MODE hide_in_play_mode: Bool = false, "hideInPlayMode", Renderable;
    41 KEEP_UPRIGHT keep_upright: Bool = false, "keepUpright", Physics;
    42 IS_PLAYER_CONTROLLABLE is_player_controllable: Bool = false, "isPlayerControllable", None;
    43 WAS_CLONED_BY_SCRIPT was_cloned_by_script: Bool = false, "wasClonedByScript", None;
    44 USE_CONCAVE_COLLIDER use_concave_collider: Bool = true, "useConcaveCollider", Physics;
    45 SPECULATIVE_COL_DET speculative_col_det: Bool = false, "speculativeColDet", Physics;
    46 USE_STICKY_DESIRED_VELOCITY use_sticky_desired_velocity: Bool = false, "useStickyDesiredVelocity", None;
}

/// Looks up a table row by ID in constant time.
pub fn field_spec(id: FieldId) -> Option<&'static FieldSpec> {
    FIELD_TABLE.get(usize::from(id)).filter(|spec| spec.id == id)
}

/// Looks up a field ID by its save-file name.
pub fn field_id_by_name(name: &str) -> Option<FieldId> {
    FIELD_TABLE
        .iter()
        .find(|spec| spec.name == name)
        .map(|spec| spec.id)
}

fn spec_or_err(id: FieldId) -> Result<&'static FieldSpec, FieldError> {
    field_spec(id).ok_or(FieldError::UnknownField { field_id: id })
}

macro_rules! typed_access {
    ($get:ident, $set:ident, $kind:ident, $ty:ty) => {
        pub fn $get(&self, id: FieldId) -> Result<$ty, FieldError> {
            let spec = spec_or_err(id)?;
            match self.field_ref(id) {
                Some(FieldRef::$kind(value)) => Ok(*value),
                Some(other) => Err(FieldError::KindMismatch {
                    field: spec.name,
                    expected: other.kind(),
                    actual: ValueKind::$kind,
                }),
                None => Err(FieldError::UnknownField { field_id: id }),
            }
        }

        /// Returns whether the stored value changed.
        pub fn $set(&mut self, id: FieldId, value: $ty) -> Result<bool, FieldError> {
            let spec = spec_or_err(id)?;
            match self.field_mut(id) {
                Some(FieldMut::$kind(slot)) => {
                    if *slot == value {
                        return Ok(false);
                    }
                    *slot = value;
                    Ok(true)
                }
                Some(other) => Err(FieldError::KindMismatch {
                    field: spec.name,
                    expected: other.kind(),
                    actual: ValueKind::$kind,
                }),
                None => Err(FieldError::UnknownField { field_id: id }),
            }
        }
    };
}

impl ActorFields {
    typed_access!(get_bool, set_bool, Bool, bool);
    typed_access!(get_float, set_float, Float, f32);
    typed_access!(get_vec3, set_vec3, Vec3, Vec3);
    typed_access!(get_quat, set_quat, Quat, Quat);
    typed_access!(get_color, set_color, Color, Color);

    pub fn get_string(&self, id: FieldId) -> Result<&str, FieldError> {
        let spec = spec_or_err(id)?;
        match self.field_ref(id) {
            Some(FieldRef::Str(value)) => Ok(value),
            Some(other) => Err(FieldError::KindMismatch {
                field: spec.name,
                expected: other.kind(),
                actual: ValueKind::Str,
            }),
            None => Err(FieldError::UnknownField { field_id: id }),
        }
    }

    /// Returns whether the stored value changed.
    pub fn set_string(&mut self, id: FieldId, value: &str) -> Result<bool, FieldError> {
        let spec = spec_or_err(id)?;
        match self.field_mut(id) {
            Some(FieldMut::Str(slot)) => {
                if slot.as_str() == value {
                    return Ok(false);
                }
                slot.clear();
                slot.push_str(value);
                Ok(true)
            }
            Some(other) => Err(FieldError::KindMismatch {
                field: spec.name,
                expected: other.kind(),
                actual: ValueKind::Str,
            }),
            None => Err(FieldError::UnknownField { field_id: id }),
        }
    }

    pub fn get(&self, id: FieldId) -> Result<Value, FieldError> {
        self.field_ref(id)
            .map(|field| field.to_value())
            .ok_or(FieldError::UnknownField { field_id: id })
    }

    /// Kind-checked write of an owned value. Returns whether the stored
    /// value changed.
    pub fn set(&mut self, id: FieldId, value: Value) -> Result<bool, FieldError> {
        match value {
            Value::Bool(value) => self.set_bool(id, value),
            Value::Float(value) => self.set_float(id, value),
            Value::Vec3(value) => self.set_vec3(id, value),
            Value::Quat(value) => self.set_quat(id, value),
            Value::Str(value) => self.set_string(id, &value),
            Value::Color(value) => self.set_color(id, value),
        }
    }

    pub fn get_by_name(&self, name: &str) -> Result<Value, FieldError> {
        let id = field_id_by_name(name).ok_or_else(|| FieldError::UnknownFieldName {
            name: name.to_string(),
        })?;
        self.get(id)
    }

    pub fn set_by_name(&mut self, name: &str, value: Value) -> Result<bool, FieldError> {
        let id = field_id_by_name(name).ok_or_else(|| FieldError::UnknownFieldName {
            name: name.to_string(),
        })?;
        self.set(id, value)
    }
}
