pub mod media_tests;
pub mod session_tests;

use std::sync::Arc;
use tether_client::session::HostSetup;
use tether_client::{ClientConfig, SessionHandle, start_host, start_viewer};
use tether_core::RoomId;
use tether_server::SignalingService;
use tracing::Level;

use crate::utils::{LoopbackTransport, RecordingInjector, ScriptedCapture, wait_for_message};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Host candidates only; tests never leave the machine.
pub fn local_config() -> ClientConfig {
    ClientConfig {
        ice_servers: Vec::new(),
        ..ClientConfig::default()
    }
}

pub fn room(code: &str) -> RoomId {
    RoomId::parse(code).unwrap()
}

/// Starts a host on `room_id` and waits until the room exists.
pub async fn open_room(
    service: &SignalingService,
    room_id: &RoomId,
    capture: Arc<ScriptedCapture>,
    injector: Arc<RecordingInjector>,
) -> anyhow::Result<SessionHandle> {
    let host = start_host(
        local_config(),
        LoopbackTransport::new(service),
        HostSetup {
            capture,
            injector,
            room_id: Some(room_id.clone()),
        },
    )
    .await?;
    wait_for_message(&host, "Room created. Waiting for viewer...").await?;
    Ok(host)
}

pub async fn join_room(
    service: &SignalingService,
    room_id: &RoomId,
) -> anyhow::Result<SessionHandle> {
    let transport = LoopbackTransport::new(service);
    Ok(start_viewer(local_config(), transport, room_id.clone()).await?)
}
