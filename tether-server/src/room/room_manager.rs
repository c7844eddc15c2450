use crate::room::room::RoomRegistry;
use crate::room::{RelayError, Room, RoomCommand};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tether_core::{PeerId, RoomId};
use tokio::sync::mpsc;
use tracing::info;

/// Registry of live rooms, keyed by normalized room id.
#[derive(Clone)]
pub struct RoomManager {
    rooms: RoomRegistry,
    signaling: Arc<dyn SignalingOutput>,
}

impl RoomManager {
    pub fn new(signaling: Arc<dyn SignalingOutput>) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            signaling,
        }
    }

    /// Opens a room with `host` in the host slot and starts its task.
    pub fn create_room(&self, room_id: RoomId, host: PeerId) -> Result<(), RelayError> {
        let rx = match self.rooms.entry(room_id.clone()) {
            Entry::Occupied(_) => return Err(RelayError::RoomExists),
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::channel(100);
                slot.insert(tx);
                rx
            }
        };

        info!("Creating new room: {}", room_id);
        let room = Room::new(
            room_id,
            host,
            rx,
            self.signaling.clone(),
            self.rooms.clone(),
        );
        tokio::spawn(room.run());
        Ok(())
    }

    pub fn room_sender(&self, room_id: &RoomId) -> Option<mpsc::Sender<RoomCommand>> {
        self.rooms.get(room_id).map(|sender| sender.clone())
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
