use crate::room::RelayError;
use tether_core::{PeerId, SignalMessage};
use tokio::sync::oneshot;

/// Commands delivered to a room actor by the signaling service.
#[derive(Debug)]
pub enum RoomCommand {
    /// A viewer asks for the free slot. The room answers on `reply` after it
    /// has notified both sides.
    Join {
        peer_id: PeerId,
        reply: oneshot::Sender<Result<(), RelayError>>,
    },

    /// Negotiation or control traffic to pass to the counterpart.
    Forward {
        from: PeerId,
        msg: SignalMessage,
    },

    /// The peer's socket went away.
    Leave { peer_id: PeerId },
}
