use crate::{session::SessionAccessor, types::PeerId};

/// Reliable, order-preserving delivery between the peers of a session.
/// Connection setup is the implementor's concern.
pub trait Transport {
    /// Role of the local process, resolved on every read
    fn session(&self) -> SessionAccessor;

    fn local_peer(&self) -> PeerId;

    /// `None` while no host is reachable
    fn host_peer(&self) -> Option<PeerId>;

    fn connected_peers(&self) -> Vec<PeerId>;

    fn send(&mut self, peer: &PeerId, payload: &[u8]);

    /// Next payload addressed to this process, if any
    fn receive(&mut self) -> Option<(PeerId, Vec<u8>)>;

    /// Sends to every connected peer but the local one that passes `filter`
    fn broadcast(&mut self, payload: &[u8], filter: &dyn Fn(&PeerId) -> bool) {
        let local = self.local_peer();
        for peer in self.connected_peers() {
            if peer != local && filter(&peer) {
                self.send(&peer, payload);
            }
        }
    }
}
