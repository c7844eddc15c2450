use crate::config::ClientConfig;
use crate::control::{ControlChannelRelay, ControlDispatcher, InputInjector, Route};
use crate::error::{Error, Result, peer_state_message};
use crate::media::{ScreenCapture, ScreenReceiver, ScreenSender, StopCause};
use crate::peer::PeerConnection;
use crate::session::handle::{SessionCommand, SessionHandle};
use crate::session::{SessionPhase, SessionSnapshot, SessionStatus};
use crate::signaling::{SessionEventKind, SignalEvent, SignalingSession, SignalingTransport};
use bytes::Bytes;
use std::sync::Arc;
use tether_core::{
    ConnectionState, IceCandidate, RemoteControlEvent, Role, RoomId, SessionDescription,
    SignalKind, SignalMessage,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::track::track_remote::TrackRemote;

/// Label of the viewer-created channel carrying control events.
pub const CONTROL_CHANNEL_LABEL: &str = "remote-control";

/// Inbound kinds a session listens for.
const SUBSCRIBED: [SignalKind; 9] = [
    SignalKind::RoomCreated,
    SignalKind::RoomJoined,
    SignalKind::ViewerJoined,
    SignalKind::PeerDisconnected,
    SignalKind::Offer,
    SignalKind::Answer,
    SignalKind::IceCandidate,
    SignalKind::RemoteControlEvent,
    SignalKind::Error,
];

/// What the host brings to a session besides the relay link.
pub struct HostSetup {
    pub capture: Arc<dyn ScreenCapture>,
    pub injector: Arc<dyn InputInjector>,
    /// Generated when absent.
    pub room_id: Option<RoomId>,
}

enum PeerEvent {
    State(ConnectionState),
    LocalCandidate(IceCandidate),
    DataChannel(Arc<RTCDataChannel>),
    ControlPayload(Bytes),
    RemoteTrack(Arc<TrackRemote>),
}

enum SessionEvent {
    Signal(SignalEvent),
    /// Tagged with the connection generation so a replaced connection
    /// cannot leak late events into its successor.
    Peer {
        generation: u64,
        event: PeerEvent,
    },
    CaptureStopped(StopCause),
}

enum RoleParts {
    Host {
        sender: ScreenSender,
        dispatcher: ControlDispatcher,
    },
    Viewer {
        receiver: ScreenReceiver,
        relay: ControlChannelRelay,
    },
}

/// Opens a room and shares the screen with whoever joins it.
pub async fn start_host(
    config: ClientConfig,
    transport: Arc<dyn SignalingTransport>,
    setup: HostSetup,
) -> Result<SessionHandle> {
    let room_id = setup.room_id.unwrap_or_else(RoomId::generate);
    let signaling = SignalingSession::new(Role::Host, transport);
    let parts = RoleParts::Host {
        sender: ScreenSender::new(setup.capture),
        dispatcher: ControlDispatcher::new(setup.injector),
    };
    Orchestrator::launch(config, signaling, room_id, parts).await
}

/// Joins `room_id` and negotiates a link to its host.
pub async fn start_viewer(
    config: ClientConfig,
    transport: Arc<dyn SignalingTransport>,
    room_id: RoomId,
) -> Result<SessionHandle> {
    let signaling = SignalingSession::new(Role::Viewer, transport);
    let parts = RoleParts::Viewer {
        receiver: ScreenReceiver::new(),
        relay: ControlChannelRelay::new(signaling.clone(), room_id.clone()),
    };
    Orchestrator::launch(config, signaling, room_id, parts).await
}

/// Owns every resource of one session and drives it from a single task.
struct Orchestrator {
    config: ClientConfig,
    room_id: RoomId,
    signaling: SignalingSession,
    parts: RoleParts,
    peer: Option<Arc<PeerConnection>>,
    generation: u64,
    early_candidates: Vec<IceCandidate>,
    pending_offer: Option<SessionDescription>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    status: watch::Sender<SessionStatus>,
    closed: bool,
}

impl Orchestrator {
    async fn launch(
        config: ClientConfig,
        signaling: SignalingSession,
        room_id: RoomId,
        parts: RoleParts,
    ) -> Result<SessionHandle> {
        let role = signaling.role();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (status, status_rx) =
            watch::channel(SessionStatus::new(SessionPhase::Starting, "Connecting..."));

        // Handlers go in before the link opens so nothing is missed.
        for kind in SUBSCRIBED {
            let tx = events_tx.clone();
            signaling.on(kind, move |event| {
                let _ = tx.send(SessionEvent::Signal(event.clone()));
            });
        }
        let tx = events_tx.clone();
        signaling.on(SessionEventKind::TransportClosed, move |event| {
            let _ = tx.send(SessionEvent::Signal(event.clone()));
        });

        if let RoleParts::Host { sender, .. } = &parts {
            let tx = events_tx.clone();
            sender.on_stopped(move |cause| {
                let _ = tx.send(SessionEvent::CaptureStopped(cause));
            });
        }

        let mut orchestrator = Orchestrator {
            config,
            room_id: room_id.clone(),
            signaling,
            parts,
            peer: None,
            generation: 0,
            early_candidates: Vec::new(),
            pending_offer: None,
            events_tx,
            events_rx,
            commands,
            status,
            closed: false,
        };

        if let Err(e) = orchestrator.open_room().await {
            orchestrator.fail(format!("Failed to connect: {}", e.user_message()));
            orchestrator.signaling.disconnect().await;
            return Err(e);
        }

        tokio::spawn(orchestrator.run());
        Ok(SessionHandle::new(role, room_id, status_rx, commands_tx))
    }

    async fn open_room(&mut self) -> Result<()> {
        self.signaling.connect().await?;
        self.set(SessionPhase::Starting, "Connected to server");
        match self.signaling.role() {
            Role::Host => self.signaling.create_room(&self.room_id),
            Role::Viewer => {
                self.signaling.join_room(&self.room_id)?;
                self.set(SessionPhase::WaitingForPeer, "Joining room...");
                Ok(())
            }
        }
    }

    async fn run(mut self) {
        info!(room = %self.room_id, role = %self.signaling.role(), "Session started");
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => {
                        if !self.handle_command(cmd).await {
                            break;
                        }
                    }
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event).await,
            }
        }
        info!(room = %self.room_id, "Session ended");
    }

    /// Returns `false` once the session is closed.
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::SendControl { event, reply } => {
                let _ = reply.send(self.send_control(&event).await);
                true
            }
            SessionCommand::AttachRenderTarget(target) => {
                match &self.parts {
                    RoleParts::Viewer { receiver, .. } => receiver.set_render_target(target),
                    RoleParts::Host { .. } => warn!("Host sessions do not render a stream"),
                }
                true
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot().await);
                true
            }
            SessionCommand::Close(reply) => {
                self.teardown().await;
                let _ = reply.send(());
                false
            }
        }
    }

    async fn send_control(&self, event: &RemoteControlEvent) -> Result<Route> {
        match &self.parts {
            RoleParts::Viewer { relay, .. } => relay.send(event).await,
            RoleParts::Host { .. } => Err(Error::RoleMismatch {
                expected: Role::Viewer,
            }),
        }
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Signal(SignalEvent::Message(msg)) => self.handle_signal(msg).await,
            SessionEvent::Signal(SignalEvent::TransportClosed { reason }) => {
                warn!("Signaling link dropped: {}", reason);
                let linked = self.peer_state() == Some(ConnectionState::Connected);
                self.publish(|status| {
                    if !linked {
                        status.phase = SessionPhase::PeerLeft;
                        status.peer_present = false;
                    }
                    status.message = "Signaling connection lost".to_string();
                });
            }
            SessionEvent::Peer { generation, event } => {
                if generation != self.generation {
                    debug!("Dropping event from replaced connection");
                    return;
                }
                self.handle_peer_event(event).await;
            }
            SessionEvent::CaptureStopped(cause) => {
                if cause == StopCause::Revoked && !self.closed {
                    self.publish(|status| {
                        status.message = "Screen sharing stopped".to_string();
                    });
                }
            }
        }
    }

    async fn handle_signal(&mut self, msg: SignalMessage) {
        let role = self.signaling.role();
        match (role, msg) {
            (Role::Host, SignalMessage::RoomCreated { room_id }) => {
                info!("Room {} created", room_id);
                self.set(
                    SessionPhase::WaitingForPeer,
                    "Room created. Waiting for viewer...",
                );
            }
            (Role::Host, SignalMessage::ViewerJoined { .. }) => self.begin_sharing().await,
            (Role::Host, SignalMessage::Offer { offer, .. }) => self.accept_offer(offer).await,
            (Role::Host, SignalMessage::RemoteControlEvent { event, .. }) => {
                if let RoleParts::Host { dispatcher, .. } = &self.parts {
                    dispatcher.dispatch_value(event);
                }
            }
            (Role::Viewer, SignalMessage::RoomJoined { .. }) => self.begin_viewing().await,
            (Role::Viewer, SignalMessage::Answer { answer, .. }) => {
                self.accept_answer(answer).await
            }
            (_, SignalMessage::IceCandidate { candidate, .. }) => {
                self.add_remote_candidate(candidate).await
            }
            (_, SignalMessage::PeerDisconnected { .. }) => self.peer_left(),
            (_, SignalMessage::Error { message }) => self.fail(format!("Error: {message}")),
            (role, other) => debug!("{} ignores {}", role, other.kind()),
        }
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::State(state) => self.peer_state_changed(state),
            PeerEvent::LocalCandidate(candidate) => {
                if let Err(e) = self.signaling.send_ice_candidate(&self.room_id, candidate) {
                    warn!("Could not send ICE candidate: {}", e);
                }
            }
            PeerEvent::DataChannel(dc) => {
                info!("Control channel '{}' announced by viewer", dc.label());
            }
            PeerEvent::ControlPayload(payload) => {
                if let RoleParts::Host { dispatcher, .. } = &self.parts {
                    dispatcher.dispatch_bytes(&payload);
                }
            }
            PeerEvent::RemoteTrack(track) => {
                if let RoleParts::Viewer { receiver, .. } = &self.parts {
                    receiver.on_remote_track(track);
                    self.set(SessionPhase::Connected, "Receiving stream...");
                }
            }
        }
    }

    async fn begin_sharing(&mut self) {
        self.publish(|status| {
            status.phase = SessionPhase::Negotiating;
            status.message = "Viewer connected. Setting up connection...".to_string();
            status.peer_present = true;
        });

        let peer = match self.new_peer().await {
            Ok(peer) => peer,
            Err(e) => {
                self.fail(format!("Failed to start sharing: {}", e.user_message()));
                return;
            }
        };
        let started = match &self.parts {
            RoleParts::Host { sender, .. } => sender.start(&peer).await,
            RoleParts::Viewer { .. } => return,
        };
        if let Err(e) = started {
            self.fail(format!("Failed to start sharing: {}", e.user_message()));
            return;
        }

        if let Some(offer) = self.pending_offer.take() {
            self.accept_offer(offer).await;
        }
    }

    async fn accept_offer(&mut self, offer: SessionDescription) {
        let Some(peer) = self.peer.clone() else {
            debug!("Offer arrived before the viewer was set up, holding it");
            self.pending_offer = Some(offer);
            return;
        };
        if let RoleParts::Host { sender, .. } = &self.parts
            && !sender.is_capturing().await
        {
            warn!("Ignoring offer, nothing is being shared");
            return;
        }
        if let Err(e) = self.answer(&peer, &offer).await {
            self.fail(format!("Error: {}", e.user_message()));
        }
    }

    async fn answer(&self, peer: &PeerConnection, offer: &SessionDescription) -> Result<()> {
        let applied = peer.set_remote_description(offer).await?;
        debug!("Applied {} queued candidates", applied);
        let answer = peer.create_answer().await?;
        peer.set_local_description(&answer).await?;
        self.signaling.send_answer(&self.room_id, answer)
    }

    async fn begin_viewing(&mut self) {
        self.publish(|status| {
            status.phase = SessionPhase::Negotiating;
            status.message = "Room joined. Connecting to host...".to_string();
            status.peer_present = true;
        });
        match self.offer().await {
            Ok(()) => self.set(SessionPhase::Negotiating, "Waiting for host..."),
            Err(e) => self.fail(format!("Failed to setup connection: {}", e.user_message())),
        }
    }

    async fn offer(&mut self) -> Result<()> {
        let peer = self.new_peer().await?;
        peer.add_video_receiver().await?;

        let dc = peer.create_data_channel(CONTROL_CHANNEL_LABEL).await?;
        dc.on_open(Box::new(|| {
            Box::pin(async {
                info!("Control channel open");
            })
        }));
        if let RoleParts::Viewer { relay, .. } = &self.parts {
            relay.set_link(dc);
        }

        let offer = peer.create_offer().await?;
        peer.set_local_description(&offer).await?;
        self.signaling.send_offer(&self.room_id, offer)
    }

    async fn accept_answer(&mut self, answer: SessionDescription) {
        let Some(peer) = self.peer.clone() else {
            warn!("Answer without a pending offer");
            return;
        };
        match peer.set_remote_description(&answer).await {
            Ok(applied) => debug!("Applied {} queued candidates", applied),
            Err(e) => self.fail(format!("Error: {}", e.user_message())),
        }
    }

    async fn add_remote_candidate(&mut self, candidate: IceCandidate) {
        let Some(peer) = self.peer.clone() else {
            self.early_candidates.push(candidate);
            return;
        };
        match peer.add_remote_candidate(candidate).await {
            Ok(disposition) => debug!("Remote candidate {:?}", disposition),
            Err(e) => warn!("Rejected remote candidate: {}", e),
        }
    }

    fn peer_state_changed(&mut self, state: ConnectionState) {
        match state {
            ConnectionState::Connected => {
                let message = match &self.parts {
                    RoleParts::Host { .. } => "Screen sharing active",
                    RoleParts::Viewer { receiver, .. } if receiver.has_stream() => {
                        "Receiving stream..."
                    }
                    RoleParts::Viewer { .. } => "Connected to host",
                };
                self.publish(|status| {
                    status.phase = SessionPhase::Connected;
                    status.message = message.to_string();
                    status.connected = true;
                    status.peer_present = true;
                });
            }
            ConnectionState::Disconnected => self.publish(|status| {
                status.message = peer_state_message(state);
                status.connected = false;
            }),
            ConnectionState::Failed | ConnectionState::Closed => {
                if let RoleParts::Viewer { receiver, .. } = &self.parts {
                    receiver.mark_inactive();
                }
                let phase = if state == ConnectionState::Failed {
                    SessionPhase::Failed
                } else {
                    SessionPhase::PeerLeft
                };
                self.publish(|status| {
                    status.phase = phase;
                    status.message = peer_state_message(state);
                    status.connected = false;
                });
            }
            ConnectionState::New | ConnectionState::Connecting => {
                debug!("Peer link {}", state);
            }
        }
    }

    fn peer_left(&mut self) {
        let message = match &self.parts {
            RoleParts::Host { .. } => "Viewer disconnected",
            RoleParts::Viewer { receiver, .. } => {
                receiver.mark_inactive();
                "Host disconnected"
            }
        };
        self.publish(|status| {
            status.phase = SessionPhase::PeerLeft;
            status.message = message.to_string();
            status.connected = false;
            status.peer_present = false;
        });
    }

    /// Replaces the current connection with a fresh one wired into the
    /// event loop, and feeds it any candidates that arrived early.
    async fn new_peer(&mut self) -> Result<Arc<PeerConnection>> {
        self.release_peer().await;
        self.generation += 1;
        let generation = self.generation;

        let peer = Arc::new(PeerConnection::new(&self.config.ice_servers).await?);

        let tx = self.events_tx.clone();
        peer.on_state_change(move |state| {
            let _ = tx.send(SessionEvent::Peer {
                generation,
                event: PeerEvent::State(state),
            });
        });

        let tx = self.events_tx.clone();
        peer.on_local_candidate(move |candidate| {
            let _ = tx.send(SessionEvent::Peer {
                generation,
                event: PeerEvent::LocalCandidate(candidate),
            });
        });

        let tx = self.events_tx.clone();
        peer.on_data_channel(move |dc| {
            // Registered here rather than in the loop so no early message
            // slips past.
            let payloads = tx.clone();
            dc.on_message(Box::new(move |msg: DataChannelMessage| {
                let payloads = payloads.clone();
                Box::pin(async move {
                    let _ = payloads.send(SessionEvent::Peer {
                        generation,
                        event: PeerEvent::ControlPayload(msg.data),
                    });
                })
            }));
            let _ = tx.send(SessionEvent::Peer {
                generation,
                event: PeerEvent::DataChannel(dc),
            });
        });

        let tx = self.events_tx.clone();
        peer.on_track(move |track| {
            let _ = tx.send(SessionEvent::Peer {
                generation,
                event: PeerEvent::RemoteTrack(track),
            });
        });

        for candidate in std::mem::take(&mut self.early_candidates) {
            if let Err(e) = peer.add_remote_candidate(candidate).await {
                warn!("Rejected early candidate: {}", e);
            }
        }

        self.peer = Some(peer.clone());
        Ok(peer)
    }

    async fn release_peer(&mut self) {
        match &self.parts {
            RoleParts::Host { sender, .. } => sender.stop().await,
            RoleParts::Viewer { receiver, relay } => {
                relay.clear_link();
                receiver.mark_inactive();
            }
        }
        if let Some(peer) = self.peer.take()
            && let Err(e) = peer.close().await
        {
            debug!("Closing peer connection: {}", e);
        }
    }

    /// Releases everything the session holds. Runs at most once.
    async fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.signaling.disconnect().await;
        self.release_peer().await;
        if let RoleParts::Viewer { receiver, .. } = &self.parts {
            receiver.clear();
        }
        self.early_candidates.clear();
        self.pending_offer = None;

        self.publish(|status| {
            *status = SessionStatus::new(SessionPhase::Closed, "Session closed");
        });
    }

    async fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot {
            signaling_connected: self.signaling.is_connected(),
            signal_handlers: self.signaling.handler_count(),
            queued_candidates: self.early_candidates.len(),
            ..Default::default()
        };
        if let Some(peer) = &self.peer {
            snapshot.peer_connection = true;
            snapshot.connection_state = Some(peer.state());
            snapshot.attached_tracks = peer.attached_track_count().await;
            snapshot.queued_candidates += peer.queued_candidates().await;
            snapshot.data_channel_open = peer
                .data_channel()
                .is_some_and(|dc| dc.ready_state() == RTCDataChannelState::Open);
        }
        match &self.parts {
            RoleParts::Host { sender, .. } => snapshot.capturing = sender.is_capturing().await,
            RoleParts::Viewer { receiver, .. } => snapshot.has_stream = receiver.has_stream(),
        }
        snapshot
    }

    fn peer_state(&self) -> Option<ConnectionState> {
        self.peer.as_ref().map(|peer| peer.state())
    }

    fn set(&self, phase: SessionPhase, message: &str) {
        self.publish(|status| {
            status.phase = phase;
            status.message = message.to_string();
        });
    }

    fn fail(&self, message: String) {
        self.publish(|status| {
            status.phase = SessionPhase::Failed;
            status.message = message;
        });
    }

    fn publish(&self, update: impl FnOnce(&mut SessionStatus)) {
        self.status.send_modify(update);
        let status = self.status.borrow();
        info!(phase = %status.phase, "{}", status.message);
    }
}
