use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// One half of the offer/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Trickle ICE candidate in its browser-compatible JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Named events exchanged with the relay, one JSON frame each:
/// `{"event": "offer", "data": {...}}`.
///
/// Frames sent to the relay carry `roomId`; frames delivered by the relay
/// carry `from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum SignalMessage {
    CreateRoom {
        room_id: RoomId,
    },
    JoinRoom {
        room_id: RoomId,
    },
    RoomCreated {
        room_id: RoomId,
    },
    RoomJoined {
        room_id: RoomId,
    },
    ViewerJoined {
        room_id: RoomId,
    },
    PeerDisconnected {
        room_id: RoomId,
    },
    Offer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        offer: SessionDescription,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
    },
    Answer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        answer: SessionDescription,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
    },
    IceCandidate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        candidate: IceCandidate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
    },
    /// The event stays an opaque JSON value on the wire so the relay never
    /// has to understand the control schema.
    RemoteControlEvent {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        event: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
    },
    Error {
        message: String,
    },
}

/// Discriminant of [`SignalMessage`], used to key handler tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    CreateRoom,
    JoinRoom,
    RoomCreated,
    RoomJoined,
    ViewerJoined,
    PeerDisconnected,
    Offer,
    Answer,
    IceCandidate,
    RemoteControlEvent,
    Error,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::CreateRoom => "create-room",
            SignalKind::JoinRoom => "join-room",
            SignalKind::RoomCreated => "room-created",
            SignalKind::RoomJoined => "room-joined",
            SignalKind::ViewerJoined => "viewer-joined",
            SignalKind::PeerDisconnected => "peer-disconnected",
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
            SignalKind::RemoteControlEvent => "remote-control-event",
            SignalKind::Error => "error",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SignalMessage {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalMessage::CreateRoom { .. } => SignalKind::CreateRoom,
            SignalMessage::JoinRoom { .. } => SignalKind::JoinRoom,
            SignalMessage::RoomCreated { .. } => SignalKind::RoomCreated,
            SignalMessage::RoomJoined { .. } => SignalKind::RoomJoined,
            SignalMessage::ViewerJoined { .. } => SignalKind::ViewerJoined,
            SignalMessage::PeerDisconnected { .. } => SignalKind::PeerDisconnected,
            SignalMessage::Offer { .. } => SignalKind::Offer,
            SignalMessage::Answer { .. } => SignalKind::Answer,
            SignalMessage::IceCandidate { .. } => SignalKind::IceCandidate,
            SignalMessage::RemoteControlEvent { .. } => SignalKind::RemoteControlEvent,
            SignalMessage::Error { .. } => SignalKind::Error,
        }
    }

    /// Whether the relay passes this message through to the counterpart.
    pub fn is_forwarded(&self) -> bool {
        matches!(
            self.kind(),
            SignalKind::Offer
                | SignalKind::Answer
                | SignalKind::IceCandidate
                | SignalKind::RemoteControlEvent
        )
    }

    /// Room addressed by this message, if it names one.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            SignalMessage::CreateRoom { room_id }
            | SignalMessage::JoinRoom { room_id }
            | SignalMessage::RoomCreated { room_id }
            | SignalMessage::RoomJoined { room_id }
            | SignalMessage::ViewerJoined { room_id }
            | SignalMessage::PeerDisconnected { room_id } => Some(room_id),
            SignalMessage::Offer { room_id, .. }
            | SignalMessage::Answer { room_id, .. }
            | SignalMessage::IceCandidate { room_id, .. }
            | SignalMessage::RemoteControlEvent { room_id, .. } => room_id.as_ref(),
            SignalMessage::Error { .. } => None,
        }
    }

    /// Rewrites a forwarded message the way the relay delivers it: the room
    /// id is dropped and the sender is stamped into `from`.
    pub fn stamped_from(self, sender: &PeerId) -> Self {
        let from = Some(sender.clone());
        match self {
            SignalMessage::Offer { offer, .. } => SignalMessage::Offer {
                room_id: None,
                offer,
                from,
            },
            SignalMessage::Answer { answer, .. } => SignalMessage::Answer {
                room_id: None,
                answer,
                from,
            },
            SignalMessage::IceCandidate { candidate, .. } => SignalMessage::IceCandidate {
                room_id: None,
                candidate,
                from,
            },
            SignalMessage::RemoteControlEvent { event, .. } => SignalMessage::RemoteControlEvent {
                room_id: None,
                event,
                from,
            },
            other => other,
        }
    }
}
