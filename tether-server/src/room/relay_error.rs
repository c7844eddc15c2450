/// Rejections the relay reports back to a client as an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Room already exists")]
    RoomExists,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is full")]
    RoomFull,
    #[error("Already in a room")]
    AlreadyInRoom,
}

impl From<RelayError> for tether_core::SignalMessage {
    fn from(err: RelayError) -> Self {
        tether_core::SignalMessage::Error {
            message: err.to_string(),
        }
    }
}
