use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use log::{debug, warn};

use troupe_shared::{Envelope, OrderedReceiver, PeerId, ReceiverError, ReliableSender, Rpc};

use crate::{error::TransportError, replication::transport::Transport};

/// Ordered reliable channel to one remote peer
struct PeerChannel {
    sender: ReliableSender<Rpc>,
    receiver: OrderedReceiver<Rpc>,
}

impl PeerChannel {
    fn new(resend_interval: Duration) -> Self {
        Self {
            sender: ReliableSender::new(resend_interval),
            receiver: OrderedReceiver::new(),
        }
    }
}

/// Peers that appeared or disappeared since the last refresh
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerChanges {
    pub joined: Vec<PeerId>,
    pub left: Vec<PeerId>,
}

/// Runs one ordered reliable channel per remote peer over a raw
/// [`Transport`]. Every call sent to a peer is delivered to it exactly once
/// and in send order, whatever the transport drops, duplicates or reorders.
pub struct ReplicationAdapter {
    transport: Box<dyn Transport>,
    local_peer: PeerId,
    resend_interval: Duration,
    connected: BTreeSet<PeerId>,
    channels: BTreeMap<PeerId, PeerChannel>,
}

impl ReplicationAdapter {
    pub fn new(transport: Box<dyn Transport>, resend_interval: Duration) -> Self {
        let local_peer = transport.local_peer();
        Self {
            transport,
            local_peer,
            resend_interval,
            connected: BTreeSet::new(),
            channels: BTreeMap::new(),
        }
    }

    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    /// Peers seen by the last refresh
    pub fn connected_peers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.connected.iter().copied()
    }

    /// Compares the transport's peer list with the last one seen. Channels
    /// of departed peers are dropped with their unacked calls.
    pub fn refresh_peers(&mut self) -> PeerChanges {
        let current: BTreeSet<PeerId> = self
            .transport
            .connected_peers()
            .into_iter()
            .filter(|peer| *peer != self.local_peer)
            .collect();

        let changes = PeerChanges {
            joined: current.difference(&self.connected).copied().collect(),
            left: self.connected.difference(&current).copied().collect(),
        };
        for peer in &changes.left {
            debug!("Peer {} left, dropping its channel", peer);
            self.channels.remove(peer);
        }
        self.connected = current;
        changes
    }

    /// Queues a call for one peer. Calls addressed to this peer are dropped.
    pub fn send_to(&mut self, peer: PeerId, rpc: Rpc) {
        if peer == self.local_peer {
            debug!("Not sending {} to ourselves", rpc.name());
            return;
        }
        let resend_interval = self.resend_interval;
        self.channels
            .entry(peer)
            .or_insert_with(|| PeerChannel::new(resend_interval))
            .sender
            .push(rpc);
    }

    /// Queues a call for every connected peer
    pub fn broadcast(&mut self, rpc: Rpc) {
        let peers: Vec<PeerId> = self.connected.iter().copied().collect();
        for peer in peers {
            self.send_to(peer, rpc.clone());
        }
    }

    /// Hands every new or resend-due envelope to the transport. Send failures
    /// are logged; the envelope stays queued and is retried after the resend
    /// interval.
    pub fn flush(&mut self, now: Duration) {
        for (peer, channel) in self.channels.iter_mut() {
            for (index, rpc) in channel.sender.collect_due(now) {
                let bytes = Envelope::data_bytes(index, rpc);
                if let Err(error) = self.transport.send(*peer, &bytes) {
                    warn!("{}", error);
                }
            }
        }
    }

    /// Drains the transport. Returns calls that became deliverable, each
    /// exactly once and in the order its sender issued them.
    pub fn receive(&mut self) -> Result<Vec<(PeerId, Rpc)>, TransportError> {
        let mut delivered = Vec::new();

        while let Some((sender, payload)) = self.transport.receive()? {
            if sender == self.local_peer {
                debug!("Ignoring an echo of our own envelope");
                continue;
            }

            let envelope = match Envelope::from_bytes(&payload) {
                Ok(envelope) => envelope,
                Err(error) => {
                    warn!("Dropping payload from {}: {}", sender, error);
                    continue;
                }
            };

            match envelope {
                Envelope::Ack { index } => {
                    if let Some(channel) = self.channels.get_mut(&sender) {
                        channel.sender.ack(index);
                    }
                }
                Envelope::Data { index, rpc } => {
                    let resend_interval = self.resend_interval;
                    let channel = self
                        .channels
                        .entry(sender)
                        .or_insert_with(|| PeerChannel::new(resend_interval));

                    let acked = match channel.receiver.try_process(index, rpc) {
                        Ok(ready) => {
                            delivered.extend(ready.into_iter().map(|rpc| (sender, rpc)));
                            true
                        }
                        Err(ReceiverError::DuplicateMessage { .. }) => {
                            debug!("Duplicate envelope {} from {}", index, sender);
                            true
                        }
                        Err(error) => {
                            warn!("Not acking envelope from {}: {}", sender, error);
                            false
                        }
                    };

                    if acked {
                        let ack = Envelope::Ack { index }.to_bytes();
                        if let Err(error) = self.transport.send(sender, &ack) {
                            warn!("{}", error);
                        }
                    }
                }
            }
        }

        Ok(delivered)
    }

    /// Calls sent but not yet acknowledged, over every channel
    pub fn unacked_len(&self) -> usize {
        self.channels
            .values()
            .map(|channel| channel.sender.unacked_len())
            .sum()
    }
}
