use std::{collections::HashMap, time::Duration};

use log::{debug, warn};

use troupe_shared::{PeerId, ReplicationHandle, Rpc};

struct WaitingRpc {
    queued_at: Duration,
    sender: PeerId,
    rpc: Rpc,
}

/// Holds inbound calls that reference a replica which has not been created
/// yet, until its `CreateReplica` arrives or the entry expires
pub struct HandleWaitlist {
    ttl: Duration,
    waiting: HashMap<ReplicationHandle, Vec<WaitingRpc>>,
}

impl HandleWaitlist {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            waiting: HashMap::new(),
        }
    }

    pub fn queue(&mut self, handle: ReplicationHandle, now: Duration, sender: PeerId, rpc: Rpc) {
        debug!("Waitlisting {} for unknown replica {}", rpc.name(), handle);
        self.waiting.entry(handle).or_default().push(WaitingRpc {
            queued_at: now,
            sender,
            rpc,
        });
    }

    /// Removes and returns the calls waiting on `handle`, in arrival order
    pub fn release(&mut self, handle: &ReplicationHandle) -> Vec<(PeerId, Rpc)> {
        self.waiting
            .remove(handle)
            .map(|entries| {
                entries
                    .into_iter()
                    .map(|entry| (entry.sender, entry.rpc))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn discard(&mut self, handle: &ReplicationHandle) {
        self.waiting.remove(handle);
    }

    /// Drops entries older than the TTL and returns how many were dropped
    pub fn expire(&mut self, now: Duration) -> usize {
        let ttl = self.ttl;
        let mut expired = 0;
        self.waiting.retain(|handle, entries| {
            let before = entries.len();
            entries.retain(|entry| now.saturating_sub(entry.queued_at) < ttl);
            let dropped = before - entries.len();
            if dropped > 0 {
                warn!(
                    "Dropping {} call(s) for replica {} that never arrived",
                    dropped, handle
                );
                expired += dropped;
            }
            !entries.is_empty()
        });
        expired
    }

    /// Total number of waiting calls
    pub fn len(&self) -> usize {
        self.waiting.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn clear(&mut self) {
        self.waiting.clear();
    }
}
