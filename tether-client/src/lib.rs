pub mod config;
pub mod control;
pub mod error;
pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;

pub use config::{ClientConfig, ReconnectPolicy};
pub use error::{CaptureFailure, Error, Result, TransportError};
pub use session::{
    SessionHandle, SessionPhase, SessionSnapshot, SessionStatus, start_host, start_viewer,
};
