use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a negotiated peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// `Failed` and `Closed` end the life of a connection instance.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// Nothing leaves `Closed`, `Failed` may only be closed, and nothing
    /// returns to `New`. `Disconnected` may recover through `Connecting` or
    /// straight back to `Connected`.
    pub fn accepts(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        if self == next {
            return false;
        }
        match (self, next) {
            (Closed, _) => false,
            (Failed, Closed) => true,
            (Failed, _) => false,
            (_, New) => false,
            (Connected, Connecting) => false,
            _ => true,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::New => "new",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
