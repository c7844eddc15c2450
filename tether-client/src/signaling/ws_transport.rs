use crate::config::{ClientConfig, ReconnectPolicy};
use crate::error::{Error, Result, TransportError};
use crate::signaling::{SignalingTransport, TransportEvent};
use async_trait::async_trait;
use futures::{Sink, SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tether_core::SignalMessage;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Default)]
struct LinkState {
    open: AtomicBool,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl LinkState {
    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<String>>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reader(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.outbound().take();
    }
}

/// WebSocket link to the relay, one JSON text frame per message.
pub struct WsTransport {
    url: String,
    connect_timeout: Duration,
    reconnect: ReconnectPolicy,
    state: Arc<LinkState>,
}

impl WsTransport {
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        reconnect: ReconnectPolicy,
    ) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
            reconnect,
            state: Arc::new(LinkState::default()),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.signaling_url.clone(),
            config.connect_timeout,
            config.reconnect,
        )
    }

    async fn connect_once(&self) -> std::result::Result<WsStream, TransportError> {
        match tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str())).await {
            Ok(Ok((stream, _))) => Ok(stream),
            Ok(Err(e)) => Err(classify(e)),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    fn spawn_link(&self, stream: WsStream, events: mpsc::UnboundedSender<TransportEvent>) {
        let (sink, mut source) = stream.split();
        let (tx, rx) = mpsc::unbounded_channel::<String>();

        *self.state.outbound() = Some(tx);
        self.state.open.store(true, Ordering::SeqCst);

        tokio::spawn(write_frames(sink, rx, self.state.clone()));

        let state = self.state.clone();
        let reader = tokio::spawn(async move {
            let reason = loop {
                match source.next().await {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<SignalMessage>(text.as_str()) {
                            Ok(msg) => {
                                debug!("Received {}", msg.kind());
                                if events.send(TransportEvent::Message(msg)).is_err() {
                                    break "listener dropped".to_string();
                                }
                            }
                            Err(e) => warn!("Invalid frame from relay: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) => break "closed by relay".to_string(),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break e.to_string(),
                    None => break "stream ended".to_string(),
                }
            };

            warn!("Signaling link dropped: {}", reason);
            state.mark_closed();
            let _ = events.send(TransportEvent::Closed(reason));
        });
        *self.state.reader() = Some(reader);
    }
}

/// Drains outbound frames into the socket. A failed write closes the link
/// so later sends report `NotConnected` instead of vanishing.
async fn write_frames<S>(
    mut sink: S,
    mut rx: mpsc::UnboundedReceiver<String>,
    state: Arc<LinkState>,
) where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(text) = rx.recv().await {
        if let Err(e) = sink.send(Message::text(text)).await {
            warn!("Signaling write failed: {}", e);
            state.mark_closed();
            break;
        }
    }
    let _ = sink.close().await;
}

fn classify(err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::Io(e) => match e.kind() {
            std::io::ErrorKind::ConnectionRefused => TransportError::Refused,
            std::io::ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Protocol(e.to_string()),
        },
        tungstenite::Error::Http(response) if response.status().as_u16() == 404 => {
            TransportError::NotFound
        }
        other => TransportError::Protocol(other.to_string()),
    }
}

fn is_retryable(err: &TransportError) -> bool {
    matches!(err, TransportError::Refused | TransportError::Timeout)
}

#[async_trait]
impl SignalingTransport for WsTransport {
    async fn open(
        &self,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> std::result::Result<(), TransportError> {
        let attempts = self.reconnect.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.connect_once().await {
                Ok(stream) => {
                    info!("Connected to signaling server {}", self.url);
                    self.spawn_link(stream, events);
                    return Ok(());
                }
                Err(e) if is_retryable(&e) && attempt < attempts => {
                    warn!(
                        "Signaling connect attempt {}/{} failed: {}",
                        attempt, attempts, e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.reconnect.delay).await;
                }
                Err(e) => {
                    warn!("Failed to connect to signaling server {}: {}", self.url, e);
                    return Err(e);
                }
            }
        }
    }

    fn send(&self, msg: &SignalMessage) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }
        let json = serde_json::to_string(msg).map_err(|e| TransportError::Protocol(e.to_string()))?;
        match self.state.outbound().as_ref() {
            Some(tx) if tx.send(json).is_ok() => Ok(()),
            _ => Err(Error::NotConnected),
        }
    }

    fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if let Some(reader) = self.state.reader().take() {
            reader.abort();
        }
        self.state.mark_closed();
        debug!("Signaling link closed locally");
    }
}
