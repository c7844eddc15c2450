use crate::room::{RoomCommand, RoomSlots};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use std::sync::Arc;
use tether_core::{PeerId, Role, RoomId, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub(crate) type RoomRegistry = Arc<DashMap<RoomId, mpsc::Sender<RoomCommand>>>;

/// One pairing context. Runs as its own task and owns the two slots, so
/// every message for a room is handled in arrival order.
pub struct Room {
    room_id: RoomId,
    slots: RoomSlots,
    command_rx: mpsc::Receiver<RoomCommand>,
    signaling: Arc<dyn SignalingOutput>,
    registry: RoomRegistry,
}

impl Room {
    pub(crate) fn new(
        room_id: RoomId,
        host: PeerId,
        command_rx: mpsc::Receiver<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
        registry: RoomRegistry,
    ) -> Self {
        Self {
            room_id,
            slots: RoomSlots::new(host),
            command_rx,
            signaling,
            registry,
        }
    }

    pub async fn run(mut self) {
        info!(room = %self.room_id, host = %self.slots.host(), "Room opened");

        self.signaling
            .send_signal(
                self.slots.host(),
                SignalMessage::RoomCreated {
                    room_id: self.room_id.clone(),
                },
            )
            .await;

        while let Some(cmd) = self.command_rx.recv().await {
            if !self.handle_command(cmd).await {
                break;
            }
        }

        self.registry.remove(&self.room_id);
        info!(room = %self.room_id, "Room closed");
    }

    /// Returns `false` once the room has no host and must shut down.
    async fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join { peer_id, reply } => {
                let outcome = self.slots.seat_viewer(peer_id.clone());
                if outcome.is_ok() {
                    info!(room = %self.room_id, viewer = %peer_id, "Viewer seated");
                    self.signaling
                        .send_signal(
                            self.slots.host(),
                            SignalMessage::ViewerJoined {
                                room_id: self.room_id.clone(),
                            },
                        )
                        .await;
                    self.signaling
                        .send_signal(
                            &peer_id,
                            SignalMessage::RoomJoined {
                                room_id: self.room_id.clone(),
                            },
                        )
                        .await;
                } else {
                    warn!(room = %self.room_id, peer = %peer_id, "Join rejected, room is full");
                }
                let _ = reply.send(outcome);
                true
            }

            RoomCommand::Forward { from, msg } => {
                let Some(target) = self.slots.counterpart(&from).cloned() else {
                    warn!(
                        room = %self.room_id,
                        peer = %from,
                        kind = %msg.kind(),
                        "Dropping message without a counterpart"
                    );
                    return true;
                };
                debug!(
                    room = %self.room_id,
                    from = %from,
                    to = %target,
                    kind = %msg.kind(),
                    "Forwarding"
                );
                self.signaling
                    .send_signal(&target, msg.stamped_from(&from))
                    .await;
                true
            }

            RoomCommand::Leave { peer_id } => match self.slots.role_of(&peer_id) {
                Some(Role::Viewer) => {
                    self.slots.vacate_viewer();
                    info!(room = %self.room_id, viewer = %peer_id, "Viewer left");
                    self.notify_disconnect(&self.slots.host().clone()).await;
                    true
                }
                Some(Role::Host) => {
                    info!(room = %self.room_id, host = %peer_id, "Host left");
                    if let Some(viewer) = self.slots.vacate_viewer() {
                        self.notify_disconnect(&viewer).await;
                    }
                    false
                }
                None => true,
            },
        }
    }

    async fn notify_disconnect(&self, peer_id: &PeerId) {
        self.signaling
            .send_signal(
                peer_id,
                SignalMessage::PeerDisconnected {
                    room_id: self.room_id.clone(),
                },
            )
            .await;
    }
}
