mod connection;
mod control;
mod peer;
mod role;
mod room;
mod signaling;

pub use connection::ConnectionState;
pub use control::{CodecError, KeyEvent, PointerEvent, RemoteControlEvent, WheelEvent};
pub use peer::{PeerId, PeerIdError};
pub use role::Role;
pub use room::{RoomId, RoomIdError};
pub use signaling::{
    IceCandidate, IceServerConfig, SdpKind, SessionDescription, SignalKind, SignalMessage,
};
