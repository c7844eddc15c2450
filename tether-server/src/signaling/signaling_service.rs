use crate::room::{RelayError, RoomCommand, RoomManager};
use crate::signaling::{PeerDirectory, SignalingOutput};
use dashmap::DashMap;
use std::sync::Arc;
use tether_core::{PeerId, RoomId, SignalMessage};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

struct SignalingInner {
    directory: Arc<PeerDirectory>,
    rooms: RoomManager,
    memberships: DashMap<PeerId, RoomId>,
}

/// Entry point for every frame a connected peer sends.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl Default for SignalingService {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingService {
    pub fn new() -> Self {
        let directory = Arc::new(PeerDirectory::new());
        let output: Arc<dyn SignalingOutput> = directory.clone();
        Self {
            inner: Arc::new(SignalingInner {
                directory,
                rooms: RoomManager::new(output),
                memberships: DashMap::new(),
            }),
        }
    }

    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<SignalMessage>) {
        self.inner.directory.insert(peer_id, tx);
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.inner.rooms
    }

    pub fn room_of(&self, peer_id: &PeerId) -> Option<RoomId> {
        self.inner.memberships.get(peer_id).map(|r| r.clone())
    }

    pub async fn handle_signal(&self, peer_id: &PeerId, msg: SignalMessage) {
        let result = match msg {
            SignalMessage::CreateRoom { room_id } => self.create_room(peer_id, room_id),
            SignalMessage::JoinRoom { room_id } => self.join_room(peer_id, room_id).await,
            msg if msg.is_forwarded() => {
                self.forward(peer_id, msg).await;
                Ok(())
            }
            other => {
                debug!("Ignoring {} from {}", other.kind(), peer_id);
                Ok(())
            }
        };

        if let Err(err) = result {
            warn!("Rejected request from {}: {}", peer_id, err);
            self.inner
                .directory
                .send_signal(peer_id, SignalMessage::from(err))
                .await;
        }
    }

    /// Drops the peer from its room and from the directory.
    pub async fn remove_peer(&self, peer_id: &PeerId) {
        self.inner.directory.remove(peer_id);

        let Some((_, room_id)) = self.inner.memberships.remove(peer_id) else {
            return;
        };
        if let Some(room) = self.inner.rooms.room_sender(&room_id) {
            let _ = room
                .send(RoomCommand::Leave {
                    peer_id: peer_id.clone(),
                })
                .await;
        }
    }

    fn create_room(&self, peer_id: &PeerId, room_id: RoomId) -> Result<(), RelayError> {
        self.ensure_unseated(peer_id)?;
        self.inner
            .rooms
            .create_room(room_id.clone(), peer_id.clone())?;
        info!("Peer {} hosts room {}", peer_id, room_id);
        self.inner.memberships.insert(peer_id.clone(), room_id);
        Ok(())
    }

    async fn join_room(&self, peer_id: &PeerId, room_id: RoomId) -> Result<(), RelayError> {
        self.ensure_unseated(peer_id)?;
        let room = self
            .inner
            .rooms
            .room_sender(&room_id)
            .ok_or(RelayError::RoomNotFound)?;

        let (reply, outcome) = oneshot::channel();
        room.send(RoomCommand::Join {
            peer_id: peer_id.clone(),
            reply,
        })
        .await
        .map_err(|_| RelayError::RoomNotFound)?;

        outcome.await.map_err(|_| RelayError::RoomNotFound)??;
        info!("Peer {} joined room {}", peer_id, room_id);
        self.inner.memberships.insert(peer_id.clone(), room_id);
        Ok(())
    }

    /// One room per socket; a second seat would orphan the first.
    fn ensure_unseated(&self, peer_id: &PeerId) -> Result<(), RelayError> {
        if self.inner.memberships.contains_key(peer_id) {
            return Err(RelayError::AlreadyInRoom);
        }
        Ok(())
    }

    /// Frames from a peer outside the named room are dropped, never bounced.
    async fn forward(&self, peer_id: &PeerId, msg: SignalMessage) {
        let kind = msg.kind();
        let Some(room_id) = self.room_of(peer_id) else {
            warn!(peer = %peer_id, "Dropping {}, sender is not in a room", kind);
            return;
        };
        if let Some(named) = msg.room_id()
            && *named != room_id
        {
            warn!(peer = %peer_id, room = %room_id, "Dropping {} addressed to {}", kind, named);
            return;
        }

        let Some(room) = self.inner.rooms.room_sender(&room_id) else {
            warn!(peer = %peer_id, room = %room_id, "Dropping {}, room is gone", kind);
            return;
        };
        let command = RoomCommand::Forward {
            from: peer_id.clone(),
            msg,
        };
        if room.send(command).await.is_err() {
            warn!(peer = %peer_id, room = %room_id, "Dropping {}, room closed", kind);
        }
    }
}
