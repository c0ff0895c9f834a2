use log::warn;

use crate::persist::record::PersistedRecord;

/// Version stamped on every record written by this build
pub const CURRENT_VERSION: u32 = 8;

const FIRST_VERSION_WITH_IS_SOLID: u32 = 1;
const FIRST_VERSION_WITH_SPAWN_TRANSFORM: u32 = 2;
const FIRST_VERSION_WITH_EXPLICIT_UPRIGHT: u32 = 3;
const FIRST_VERSION_WITH_CLONE_PROPAGATION: u32 = 4;
const FIRST_VERSION_WITH_PHYSICS_ATTRIBUTES: u32 = 5;
const FIRST_VERSION_SHOWING_PLAYERS: u32 = 6;
const FIRST_VERSION_WITH_CONCAVE_COLLIDER: u32 = 7;

/// Brings a record written before `introduced_in` up to that version.
pub struct UpgradeRule {
    pub introduced_in: u32,
    pub apply: fn(PersistedRecord) -> PersistedRecord,
}

/// Ordered by version. Each rule only reads fields that existed before the
/// version it introduces.
pub static UPGRADE_RULES: &[UpgradeRule] = &[
    UpgradeRule {
        introduced_in: FIRST_VERSION_WITH_IS_SOLID,
        apply: |mut record| {
            record.fields.is_solid = true;
            record
        },
    },
    UpgradeRule {
        introduced_in: FIRST_VERSION_WITH_SPAWN_TRANSFORM,
        apply: |mut record| {
            record.fields.spawn_position = record.fields.position;
            record.fields.spawn_rotation = record.fields.rotation;
            record
        },
    },
    UpgradeRule {
        introduced_in: FIRST_VERSION_WITH_EXPLICIT_UPRIGHT,
        apply: |mut record| {
            record.fields.keep_upright = record.fields.is_player_controllable;
            record
        },
    },
    UpgradeRule {
        introduced_in: FIRST_VERSION_WITH_CLONE_PROPAGATION,
        apply: |mut record| {
            // copies made before propagation existed were edited independently
            record.fields.clone_parent.clear();
            if record.memory_json.contains("isClone") {
                record.fields.was_cloned_by_script = true;
            }
            record
        },
    },
    UpgradeRule {
        introduced_in: FIRST_VERSION_WITH_PHYSICS_ATTRIBUTES,
        apply: |mut record| {
            record.fields.mass = 1.0;
            record.fields.drag = 0.0;
            record.fields.angular_drag = 0.05;
            record.fields.bounciness = 0.0;
            record
        },
    },
    UpgradeRule {
        introduced_in: FIRST_VERSION_SHOWING_PLAYERS,
        apply: |mut record| {
            if record.fields.is_player_controllable {
                record.fields.hide_in_play_mode = false;
            }
            record
        },
    },
    UpgradeRule {
        introduced_in: FIRST_VERSION_WITH_CONCAVE_COLLIDER,
        apply: |mut record| {
            record.fields.use_concave_collider = true;
            record
        },
    },
];

/// Runs every rule newer than the record's version, oldest first, and
/// stamps the result with [`CURRENT_VERSION`]. Records already current are
/// returned untouched.
pub fn upgrade(mut record: PersistedRecord) -> PersistedRecord {
    if record.version > CURRENT_VERSION {
        warn!(
            "Record '{}' has version {} which is newer than {}; loading as-is",
            record.name, record.version, CURRENT_VERSION
        );
        return record;
    }

    for rule in UPGRADE_RULES {
        if record.version < rule.introduced_in {
            record = (rule.apply)(record);
            record.version = rule.introduced_in;
        }
    }

    record.version = CURRENT_VERSION;
    record
}
