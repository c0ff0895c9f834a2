//! In-memory transport for multi-peer tests
//! Routes payloads between peers of one process without network I/O, with
//! knobs to duplicate, reorder and drop payloads.
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use troupe_peer::{Transport, TransportError};
use troupe_shared::PeerId;

#[derive(Default)]
struct HubState {
    peers: BTreeSet<PeerId>,
    inboxes: HashMap<PeerId, VecDeque<(PeerId, Vec<u8>)>>,
    /// Every n-th payload is delivered twice
    duplicate_every: Option<usize>,
    /// Every n-th payload is lost
    drop_every: Option<usize>,
    /// New payloads jump the queue instead of waiting behind older ones
    reorder: bool,
    sent: usize,
    delivered: usize,
    dropped: usize,
}

/// Shared switchboard. Clone it freely; every clone sees the same peers and
/// inboxes.
#[derive(Clone, Default)]
pub struct LocalHub {
    state: Arc<Mutex<HubState>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `peer` and returns its end of the hub
    pub fn connect(&self, peer: PeerId) -> LocalTransport {
        let mut state = self.lock();
        state.peers.insert(peer);
        state.inboxes.entry(peer).or_default();
        LocalTransport {
            peer,
            hub: self.clone(),
        }
    }

    /// Removes `peer`; payloads still addressed to it are discarded
    pub fn disconnect(&self, peer: PeerId) {
        let mut state = self.lock();
        state.peers.remove(&peer);
        state.inboxes.remove(&peer);
    }

    pub fn set_duplicate_every(&self, every: Option<usize>) {
        self.lock().duplicate_every = every;
    }

    pub fn set_drop_every(&self, every: Option<usize>) {
        self.lock().drop_every = every;
    }

    pub fn set_reorder(&self, reorder: bool) {
        self.lock().reorder = reorder;
    }

    /// Places a payload in `to`'s inbox as if `from` had sent it
    pub fn inject(&self, from: PeerId, to: PeerId, payload: Vec<u8>) {
        if let Some(inbox) = self.lock().inboxes.get_mut(&to) {
            inbox.push_back((from, payload));
        }
    }

    /// Payloads waiting in any inbox
    pub fn in_flight(&self) -> usize {
        self.lock().inboxes.values().map(VecDeque::len).sum()
    }

    pub fn sent_count(&self) -> usize {
        self.lock().sent
    }

    pub fn delivered_count(&self) -> usize {
        self.lock().delivered
    }

    pub fn dropped_count(&self) -> usize {
        self.lock().dropped
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// One peer's connection to a [`LocalHub`]
pub struct LocalTransport {
    peer: PeerId,
    hub: LocalHub,
}

impl Transport for LocalTransport {
    fn local_peer(&self) -> PeerId {
        self.peer
    }

    fn connected_peers(&self) -> Vec<PeerId> {
        self.hub
            .lock()
            .peers
            .iter()
            .copied()
            .filter(|peer| *peer != self.peer)
            .collect()
    }

    fn send(&mut self, peer: PeerId, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.hub.lock();
        state.sent += 1;
        let sent = state.sent;

        if state.drop_every.map_or(false, |every| every > 0 && sent % every == 0) {
            debug!("Hub dropping payload {} to {}", sent, peer);
            state.dropped += 1;
            return Ok(());
        }
        let copies = if state
            .duplicate_every
            .map_or(false, |every| every > 0 && sent % every == 0)
        {
            2
        } else {
            1
        };
        let reorder = state.reorder;

        let Some(inbox) = state.inboxes.get_mut(&peer) else {
            return Err(TransportError::SendFailed {
                peer,
                length: payload.len(),
                reason: "peer is not connected to the hub".to_string(),
            });
        };
        for _ in 0..copies {
            if reorder {
                inbox.push_front((self.peer, payload.to_vec()));
            } else {
                inbox.push_back((self.peer, payload.to_vec()));
            }
        }
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<(PeerId, Vec<u8>)>, TransportError> {
        let mut state = self.hub.lock();
        let next = state
            .inboxes
            .get_mut(&self.peer)
            .and_then(VecDeque::pop_front);
        if next.is_some() {
            state.delivered += 1;
        }
        Ok(next)
    }
}
