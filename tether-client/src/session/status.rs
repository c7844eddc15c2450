use std::fmt;
use tether_core::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Starting,
    WaitingForPeer,
    Negotiating,
    Connected,
    PeerLeft,
    Failed,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Starting => "starting",
            SessionPhase::WaitingForPeer => "waiting",
            SessionPhase::Negotiating => "negotiating",
            SessionPhase::Connected => "connected",
            SessionPhase::PeerLeft => "peer-left",
            SessionPhase::Failed => "failed",
            SessionPhase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// The one line the presentation layer shows, plus the facts behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub message: String,
    /// Peer link is up.
    pub connected: bool,
    /// The other role is in the room.
    pub peer_present: bool,
}

impl SessionStatus {
    pub fn new(phase: SessionPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            connected: false,
            peer_present: false,
        }
    }
}

/// Which resources a session holds right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub signaling_connected: bool,
    pub signal_handlers: usize,
    pub peer_connection: bool,
    pub connection_state: Option<ConnectionState>,
    pub attached_tracks: usize,
    pub capturing: bool,
    pub has_stream: bool,
    pub data_channel_open: bool,
    pub queued_candidates: usize,
}

impl SessionSnapshot {
    /// Nothing is held any more.
    pub fn is_released(&self) -> bool {
        *self == SessionSnapshot::default()
    }
}
