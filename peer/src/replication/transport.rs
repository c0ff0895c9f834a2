use troupe_shared::PeerId;

use crate::error::TransportError;

/// Unreliable, unordered datagram delivery between peers. Payloads may be
/// lost, duplicated or reordered; the replication adapter builds ordered
/// reliable channels on top.
pub trait Transport {
    /// This peer's id
    fn local_peer(&self) -> PeerId;

    /// Every other peer currently reachable
    fn connected_peers(&self) -> Vec<PeerId>;

    fn send(&mut self, peer: PeerId, payload: &[u8]) -> Result<(), TransportError>;

    /// Next inbound payload and its sender, if any
    fn receive(&mut self) -> Result<Option<(PeerId, Vec<u8>)>, TransportError>;
}
