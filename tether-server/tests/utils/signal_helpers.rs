use anyhow::{Context, Result};
use std::time::Duration;
use tether_core::{PeerId, SignalKind, SignalMessage};
use tokio::sync::mpsc;

/// Timeout for a single relay delivery (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 2000;

/// Waits for the next delivery captured by the mock output.
pub async fn next_delivery(
    rx: &mut mpsc::UnboundedReceiver<(PeerId, SignalMessage)>,
) -> Result<(PeerId, SignalMessage)> {
    tokio::time::timeout(Duration::from_millis(SIGNAL_TIMEOUT_MS), rx.recv())
        .await
        .context("Timeout waiting for delivery")?
        .context("Signaling output dropped")
}

/// Waits for the next message on a peer's socket channel.
pub async fn next_signal(rx: &mut mpsc::UnboundedReceiver<SignalMessage>) -> Result<SignalMessage> {
    tokio::time::timeout(Duration::from_millis(SIGNAL_TIMEOUT_MS), rx.recv())
        .await
        .context("Timeout waiting for signal")?
        .context("Peer channel closed")
}

/// Skips messages until one of `kind` arrives.
pub async fn expect_kind(
    rx: &mut mpsc::UnboundedReceiver<SignalMessage>,
    kind: SignalKind,
) -> Result<SignalMessage> {
    loop {
        let msg = next_signal(rx).await?;
        if msg.kind() == kind {
            return Ok(msg);
        }
        tracing::debug!("Skipping {} while waiting for {}", msg.kind(), kind);
    }
}

/// Asserts nothing arrives on the channel for a short while.
pub async fn assert_silent(rx: &mut mpsc::UnboundedReceiver<SignalMessage>) {
    let outcome = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    if let Ok(Some(msg)) = outcome {
        panic!("unexpected {msg:?}");
    }
}
