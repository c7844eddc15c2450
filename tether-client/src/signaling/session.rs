use crate::error::{Error, Result};
use crate::signaling::{SignalingTransport, TransportEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tether_core::{IceCandidate, Role, RoomId, SessionDescription, SignalKind, SignalMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Something the session delivers to registered handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalEvent {
    Message(SignalMessage),
    TransportClosed { reason: String },
}

/// Key of the handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    Signal(SignalKind),
    TransportClosed,
}

impl SignalEvent {
    pub fn kind(&self) -> SessionEventKind {
        match self {
            SignalEvent::Message(msg) => SessionEventKind::Signal(msg.kind()),
            SignalEvent::TransportClosed { .. } => SessionEventKind::TransportClosed,
        }
    }
}

impl From<SignalKind> for SessionEventKind {
    fn from(kind: SignalKind) -> Self {
        SessionEventKind::Signal(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(&SignalEvent) + Send + Sync>;
type HandlerTable = HashMap<SessionEventKind, Vec<(HandlerId, Handler)>>;

struct SessionInner {
    role: Role,
    transport: Arc<dyn SignalingTransport>,
    handlers: Mutex<HandlerTable>,
    next_handler: AtomicU64,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl SessionInner {
    fn handlers(&self) -> MutexGuard<'_, HandlerTable> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatcher(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, event: &SignalEvent) {
        // Snapshot first so a handler may (un)register without deadlocking.
        let handlers: Vec<Handler> = self
            .handlers()
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!("No handler for {:?}", event.kind());
        }
        for handler in handlers {
            handler(event);
        }
    }
}

/// Room-level signaling for one role on top of a [`SignalingTransport`].
#[derive(Clone)]
pub struct SignalingSession {
    inner: Arc<SessionInner>,
}

impl SignalingSession {
    pub fn new(role: Role, transport: Arc<dyn SignalingTransport>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                role,
                transport,
                handlers: Mutex::new(HashMap::new()),
                next_handler: AtomicU64::new(1),
                dispatcher: Mutex::new(None),
            }),
        }
    }

    pub fn role(&self) -> Role {
        self.inner.role
    }

    /// Registers a handler. Handlers of one kind run in registration order,
    /// synchronously on the dispatch task, so they must not block.
    pub fn on<F>(&self, kind: impl Into<SessionEventKind>, handler: F) -> HandlerId
    where
        F: Fn(&SignalEvent) + Send + Sync + 'static,
    {
        let id = HandlerId(self.inner.next_handler.fetch_add(1, Ordering::Relaxed));
        self.inner
            .handlers()
            .entry(kind.into())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Returns whether a handler was removed.
    pub fn off(&self, kind: impl Into<SessionEventKind>, id: HandlerId) -> bool {
        let mut table = self.inner.handlers();
        let kind = kind.into();
        let Some(list) = table.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            table.remove(&kind);
        }
        removed
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers().values().map(Vec::len).sum()
    }

    /// Opens the transport and starts delivering inbound events.
    pub async fn connect(&self) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.inner.transport.open(tx).await?;

        let inner: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let event = match event {
                    TransportEvent::Message(msg) => SignalEvent::Message(msg),
                    TransportEvent::Closed(reason) => SignalEvent::TransportClosed { reason },
                };
                inner.dispatch(&event);
            }
        });

        if let Some(previous) = self.inner.dispatcher().replace(task) {
            previous.abort();
        }
        info!("Signaling session connected as {}", self.inner.role);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_open()
    }

    pub fn create_room(&self, room_id: &RoomId) -> Result<()> {
        self.require_role(Role::Host)?;
        self.emit(SignalMessage::CreateRoom {
            room_id: room_id.clone(),
        })
    }

    pub fn join_room(&self, room_id: &RoomId) -> Result<()> {
        self.require_role(Role::Viewer)?;
        self.emit(SignalMessage::JoinRoom {
            room_id: room_id.clone(),
        })
    }

    pub fn send_offer(&self, room_id: &RoomId, offer: SessionDescription) -> Result<()> {
        self.emit(SignalMessage::Offer {
            room_id: Some(room_id.clone()),
            offer,
            from: None,
        })
    }

    pub fn send_answer(&self, room_id: &RoomId, answer: SessionDescription) -> Result<()> {
        self.emit(SignalMessage::Answer {
            room_id: Some(room_id.clone()),
            answer,
            from: None,
        })
    }

    pub fn send_ice_candidate(&self, room_id: &RoomId, candidate: IceCandidate) -> Result<()> {
        self.emit(SignalMessage::IceCandidate {
            room_id: Some(room_id.clone()),
            candidate,
            from: None,
        })
    }

    pub fn send_remote_control_event(
        &self,
        room_id: &RoomId,
        event: serde_json::Value,
    ) -> Result<()> {
        self.emit(SignalMessage::RemoteControlEvent {
            room_id: Some(room_id.clone()),
            event,
            from: None,
        })
    }

    /// Drops every handler, stops dispatch and closes the transport.
    pub async fn disconnect(&self) {
        self.inner.handlers().clear();
        if let Some(task) = self.inner.dispatcher().take() {
            task.abort();
        }
        self.inner.transport.close().await;
        info!("Signaling session disconnected");
    }

    fn require_role(&self, expected: Role) -> Result<()> {
        if self.inner.role == expected {
            Ok(())
        } else {
            Err(Error::RoleMismatch { expected })
        }
    }

    fn emit(&self, msg: SignalMessage) -> Result<()> {
        if !self.inner.transport.is_open() {
            return Err(Error::NotConnected);
        }
        debug!("Sending {}", msg.kind());
        self.inner.transport.send(&msg)
    }
}
