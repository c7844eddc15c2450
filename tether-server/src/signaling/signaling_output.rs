use async_trait::async_trait;
use dashmap::DashMap;
use tether_core::{PeerId, SignalMessage};
use tokio::sync::mpsc;
use tracing::warn;

/// Outbound side of the relay: how a room reaches a connected peer.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Delivers one message to `peer_id`. Messages to peers that are gone
    /// are dropped.
    async fn send_signal(&self, peer_id: &PeerId, msg: SignalMessage);
}

/// Live socket senders keyed by peer.
#[derive(Default)]
pub struct PeerDirectory {
    peers: DashMap<PeerId, mpsc::UnboundedSender<SignalMessage>>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<SignalMessage>) {
        self.peers.insert(peer_id, tx);
    }

    pub fn remove(&self, peer_id: &PeerId) {
        self.peers.remove(peer_id);
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }
}

#[async_trait]
impl SignalingOutput for PeerDirectory {
    async fn send_signal(&self, peer_id: &PeerId, msg: SignalMessage) {
        match self.peers.get(peer_id) {
            Some(peer) => {
                if peer.send(msg).is_err() {
                    warn!("Socket for {} already closed", peer_id);
                }
            }
            None => warn!(
                "Attempted to send {} to disconnected peer {}",
                msg.kind(),
                peer_id
            ),
        }
    }
}
