use std::{fmt, time::Duration};

use troupe_shared::{field, OwnRequestReason, PersistedRecord};

use crate::actor::Actor;

/// Everything the owner consults when another peer asks for an actor
pub struct TransferContext<'a> {
    pub actor: &'a Actor,
    pub reason: OwnRequestReason,
    /// Local lock want count of the actor
    pub want_count: u32,
    /// The actor is this peer's player or camera actor
    pub is_local_surrogate: bool,
    pub now: Duration,
    pub collision_cooldown: Duration,
}

/// Why a transfer request was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferDenial {
    /// A collision must not take away the local player or camera actor
    LocalSurrogate,
    /// The owner holds a lock want on the actor
    LockWanted,
    /// The actor renders a resource that exists only on this peer
    LocalResource,
    /// The actor changed hands or touched the local player too recently
    CollisionCooldown,
}

impl fmt::Display for TransferDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TransferDenial::LocalSurrogate => "it is driven by the local player or camera",
            TransferDenial::LockWanted => "the owner wants it locked",
            TransferDenial::LocalResource => "it uses a local-only renderable",
            TransferDenial::CollisionCooldown => "the collision cooldown has not elapsed",
        };
        f.write_str(reason)
    }
}

/// True for renderable URIs with the `localfbx` scheme
pub fn is_local_resource(uri: &str) -> bool {
    uri.split_once(':')
        .map_or(false, |(scheme, _)| scheme.eq_ignore_ascii_case("localfbx"))
}

/// Renderable URI other peers see in place of a local-only resource
pub const NOT_AVAILABLE_URI: &str = "builtin:NotAvailable";

/// Prepares a record for other peers: local-only renderables are replaced
/// by [`NOT_AVAILABLE_URI`] since their paths mean nothing elsewhere
pub fn shareable_record(mut record: PersistedRecord) -> PersistedRecord {
    if is_local_resource(&record.fields.renderable_uri) {
        record.fields.renderable_uri = NOT_AVAILABLE_URI.to_string();
    }
    record
}

pub fn evaluate_transfer_request(context: &TransferContext<'_>) -> Result<(), TransferDenial> {
    let is_collision = context.reason == OwnRequestReason::Collision;

    if is_collision && context.is_local_surrogate {
        return Err(TransferDenial::LocalSurrogate);
    }

    if context.want_count > 0 {
        return Err(TransferDenial::LockWanted);
    }

    let uri = context
        .actor
        .fields()
        .get_string(field::RENDERABLE_URI)
        .unwrap_or_default();
    if is_local_resource(uri) {
        return Err(TransferDenial::LocalResource);
    }

    if is_collision {
        let within_cooldown = |at: Option<Duration>| {
            at.map_or(false, |at| {
                context.now.saturating_sub(at) < context.collision_cooldown
            })
        };
        if within_cooldown(context.actor.last_ownership_change)
            || within_cooldown(context.actor.last_local_player_collision)
        {
            return Err(TransferDenial::CollisionCooldown);
        }
    }

    Ok(())
}
