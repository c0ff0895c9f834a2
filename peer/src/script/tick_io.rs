use serde::{Deserialize, Serialize};

use troupe_shared::{ActorMessage, Quat, SlotIndex, Vec3};

/// Per-actor state the script needs beyond what it can read through the
/// field codec
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorRuntimeState {
    pub slot: SlotIndex,
    pub name: String,
    pub brain_name: String,
    pub is_locally_owned: bool,
    pub is_player_controllable: bool,
    /// Offstage preference of the actor's root
    pub is_offstage: bool,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    /// Memory received from the network, to replace the runtime's copy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_json: Option<String>,
}

/// A collision or trigger reported by physics. `other` is `None` for terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchEvent {
    pub receiver: SlotIndex,
    pub other: Option<SlotIndex>,
    pub is_enter: bool,
}

/// Everything handed to the script for one tick
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRequest {
    pub tick: u64,
    pub delta_seconds: f32,
    /// Name of every actor, indexed by slot
    pub actor_names: Vec<String>,
    /// Player-controllable actors and actors flagged for a resync
    pub snapshot: Vec<ActorRuntimeState>,
    pub inbound_messages: Vec<ActorMessage>,
    pub queued_touch_events: Vec<TouchEvent>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotVelocity {
    pub slot: SlotIndex,
    pub delta: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotTorque {
    pub slot: SlotIndex,
    pub torque: Vec3,
}

/// A new actor asked for by a script, optionally cloned from an existing one
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRequest {
    #[serde(default)]
    pub clone_of: Option<String>,
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quat,
}

/// Everything the script asks of the engine after one tick
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickResponse {
    pub velocity_changes: Vec<SlotVelocity>,
    pub torque_requests: Vec<SlotTorque>,
    pub outbound_messages_to_remote: Vec<ActorMessage>,
    pub outbound_messages_to_host: Vec<ActorMessage>,
    /// Slots whose memory changed and must be replicated
    pub memory_dirty_actor_ids: Vec<SlotIndex>,
    pub destroy_requests: Vec<SlotIndex>,
    pub spawn_requests: Vec<SpawnRequest>,
}

impl TickResponse {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl TickRequest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
