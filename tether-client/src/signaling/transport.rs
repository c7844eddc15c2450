use crate::error::{Result, TransportError};
use async_trait::async_trait;
use tether_core::SignalMessage;
use tokio::sync::mpsc;

/// What a transport reports upward after it has been opened.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(SignalMessage),
    /// The established link dropped. Not emitted for a local `close()`.
    Closed(String),
}

/// A persistent framed link to the signaling relay.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Opens the link; inbound frames are pushed to `events` in receive order.
    async fn open(&self, events: mpsc::UnboundedSender<TransportEvent>)
    -> std::result::Result<(), TransportError>;

    /// Queues one frame. Fails with `NotConnected` instead of buffering when
    /// the link is down.
    fn send(&self, msg: &SignalMessage) -> Result<()>;

    fn is_open(&self) -> bool;

    async fn close(&self);
}
