use crate::control::Route;
use crate::error::{Error, Result};
use crate::media::RenderTarget;
use crate::session::{SessionSnapshot, SessionStatus};
use std::sync::Arc;
use tether_core::{RemoteControlEvent, Role, RoomId};
use tokio::sync::{mpsc, oneshot, watch};
use webrtc::track::track_remote::TrackRemote;

pub(crate) enum SessionCommand {
    SendControl {
        event: RemoteControlEvent,
        reply: oneshot::Sender<Result<Route>>,
    },
    AttachRenderTarget(Arc<dyn RenderTarget<Arc<TrackRemote>>>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Close(oneshot::Sender<()>),
}

/// Presentation-facing handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    role: Role,
    room_id: RoomId,
    status: watch::Receiver<SessionStatus>,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(
        role: Role,
        room_id: RoomId,
        status: watch::Receiver<SessionStatus>,
        commands: mpsc::UnboundedSender<SessionCommand>,
    ) -> Self {
        Self {
            role,
            room_id,
            status,
            commands,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Waits until the status satisfies `predicate`. `None` if the session
    /// ended without ever doing so.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionStatus) -> bool,
    ) -> Option<SessionStatus> {
        let mut rx = self.status.clone();
        rx.wait_for(predicate)
            .await
            .ok()
            .map(|status| status.clone())
    }

    /// Viewer only.
    pub async fn send_control(&self, event: RemoteControlEvent) -> Result<Route> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(SessionCommand::SendControl { event, reply })
            .map_err(|_| Error::NotConnected)?;
        outcome.await.map_err(|_| Error::NotConnected)?
    }

    pub fn attach_render_target(&self, target: Arc<dyn RenderTarget<Arc<TrackRemote>>>) {
        let _ = self
            .commands
            .send(SessionCommand::AttachRenderTarget(target));
    }

    /// Resources currently held. Empty once the session is closed.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let (reply, outcome) = oneshot::channel();
        if self.commands.send(SessionCommand::Snapshot(reply)).is_err() {
            return SessionSnapshot::default();
        }
        outcome.await.unwrap_or_default()
    }

    /// Tears the session down. Safe at any point and more than once.
    pub async fn close(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(SessionCommand::Close(reply)).is_ok() {
            let _ = done.await;
        }
    }
}
