use std::{default::Default, time::Duration};

use serde::{Deserialize, Serialize};

/// Contains Config properties which will be used by a [`World`](crate::World)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Used to configure ownership requests and transfer decisions
    pub ownership: OwnershipConfig,
    /// Used to configure the reliable channels and the memory sync queue
    pub replication: ReplicationConfig,
    /// Longest parent chain accepted when reparenting. Walks that exceed it
    /// are treated as cycles.
    pub max_hierarchy_depth: usize,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ownership: OwnershipConfig::default(),
            replication: ReplicationConfig::default(),
            max_hierarchy_depth: 20,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipConfig {
    /// How long `request_ownership_then` waits before silently abandoning
    /// its continuation
    pub request_timeout: Duration,
    /// Collision-triggered transfer requests are denied until this much time
    /// has passed since the actor last changed hands or last touched the
    /// local player
    pub collision_cooldown: Duration,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            collision_cooldown: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Upper bound on memory blobs sent per second by the sync queue. Zero
    /// disables the limit (one per tick).
    pub memory_syncs_per_second: u32,
    /// Unacked envelopes are resent after this interval
    pub resend_interval: Duration,
    /// How long calls for a not-yet-created replica are held
    pub waitlist_ttl: Duration,
}

impl ReplicationConfig {
    /// Minimum spacing between two rate-limited memory syncs
    pub fn memory_sync_interval(&self) -> Duration {
        if self.memory_syncs_per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / self.memory_syncs_per_second
        }
    }
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            memory_syncs_per_second: 5,
            resend_interval: Duration::from_millis(100),
            waitlist_ttl: Duration::from_secs(60),
        }
    }
}
