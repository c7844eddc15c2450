use crate::room::RelayError;
use tether_core::{PeerId, Role};

/// Occupancy of one room: exactly one host, at most one viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSlots {
    host: PeerId,
    viewer: Option<PeerId>,
}

impl RoomSlots {
    pub fn new(host: PeerId) -> Self {
        Self { host, viewer: None }
    }

    pub fn host(&self) -> &PeerId {
        &self.host
    }

    pub fn viewer(&self) -> Option<&PeerId> {
        self.viewer.as_ref()
    }

    pub fn seat_viewer(&mut self, peer_id: PeerId) -> Result<(), RelayError> {
        if peer_id == self.host {
            return Err(RelayError::RoomFull);
        }
        match &self.viewer {
            Some(current) if *current != peer_id => Err(RelayError::RoomFull),
            _ => {
                self.viewer = Some(peer_id);
                Ok(())
            }
        }
    }

    pub fn role_of(&self, peer_id: &PeerId) -> Option<Role> {
        if *peer_id == self.host {
            Some(Role::Host)
        } else if self.viewer.as_ref() == Some(peer_id) {
            Some(Role::Viewer)
        } else {
            None
        }
    }

    /// The other occupant, if `peer_id` is seated and the other slot is filled.
    pub fn counterpart(&self, peer_id: &PeerId) -> Option<&PeerId> {
        match self.role_of(peer_id)? {
            Role::Host => self.viewer.as_ref(),
            Role::Viewer => Some(&self.host),
        }
    }

    pub fn vacate_viewer(&mut self) -> Option<PeerId> {
        self.viewer.take()
    }
}
