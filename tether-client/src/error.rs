use tether_core::{CodecError, ConnectionState, Role};

pub type Result<T> = std::result::Result<T, Error>;

/// Why the signaling link could not be opened or was lost.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection refused")]
    Refused,
    #[error("connection timed out")]
    Timeout,
    #[error("signaling endpoint not found")]
    NotFound,
    #[error("connection closed")]
    Closed,
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Platform categories of a failed screen-capture request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureFailure {
    #[error("permission denied")]
    PermissionDenied,
    #[error("no display found")]
    NotFound,
    #[error("display is not readable")]
    NotReadable,
    #[error("capture aborted")]
    Aborted,
    #[error("capture constraints could not be satisfied")]
    Overconstrained,
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("signaling transport is not connected")]
    NotConnected,

    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("screen capture denied: {0}")]
    CaptureDenied(CaptureFailure),

    #[error("screen capture unavailable: {0}")]
    CaptureUnavailable(CaptureFailure),

    #[error("signaling transport: {0}")]
    Transport(#[from] TransportError),

    #[error("peer connection {0}")]
    PeerState(ConnectionState),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("operation is only valid for the {expected} role")]
    RoleMismatch { expected: Role },
}

impl From<CaptureFailure> for Error {
    fn from(failure: CaptureFailure) -> Self {
        match failure {
            CaptureFailure::PermissionDenied => Error::CaptureDenied(failure),
            other => Error::CaptureUnavailable(other),
        }
    }
}

impl From<webrtc::Error> for Error {
    fn from(err: webrtc::Error) -> Self {
        Error::Negotiation(err.to_string())
    }
}

impl Error {
    /// Short text suitable for the status line.
    pub fn user_message(&self) -> String {
        match self {
            Error::NotConnected => "Not connected to signaling server.".to_string(),
            Error::Negotiation(detail) => format!("Negotiation failed: {detail}"),
            Error::CaptureDenied(_) => {
                "Screen sharing permission denied. Please grant permission to share your screen."
                    .to_string()
            }
            Error::CaptureUnavailable(failure) => match failure {
                CaptureFailure::NotFound => {
                    "No display found. Please connect a display and try again.".to_string()
                }
                CaptureFailure::NotReadable => {
                    "Display is not readable. Another application may be using it.".to_string()
                }
                CaptureFailure::Aborted => "Operation was cancelled. Please try again.".to_string(),
                CaptureFailure::Overconstrained => {
                    "Screen capture constraints could not be satisfied.".to_string()
                }
                CaptureFailure::PermissionDenied => {
                    "Permission denied. Please check your permissions.".to_string()
                }
                CaptureFailure::Other(detail) => format!("Screen capture failed: {detail}"),
            },
            Error::Transport(err) => match err {
                TransportError::Refused => {
                    "Cannot connect to signaling server. Please check if the server is running."
                        .to_string()
                }
                TransportError::Timeout => {
                    "Connection timeout. Please check your network connection.".to_string()
                }
                TransportError::NotFound => {
                    "Signaling server not found. Please check the server URL.".to_string()
                }
                TransportError::Closed => "Signaling connection lost.".to_string(),
                TransportError::Protocol(detail) => detail.clone(),
            },
            Error::PeerState(state) => peer_state_message(*state),
            Error::Codec(err) => err.to_string(),
            Error::RoleMismatch { expected } => format!("Only the {expected} can do that."),
        }
    }
}

/// Status text for a peer link that reached `state`.
pub fn peer_state_message(state: ConnectionState) -> String {
    match state {
        ConnectionState::Failed => {
            "Connection failed. Please check your network and firewall settings.".to_string()
        }
        ConnectionState::Disconnected => "Connection lost. Attempting to reconnect...".to_string(),
        ConnectionState::Closed => "Connection closed.".to_string(),
        other => format!("Connection: {other}"),
    }
}
