use std::sync::Arc;
use std::time::Duration;
use tether_client::session::HostSetup;
use tether_client::{CaptureFailure, Error, SessionPhase, TransportError, start_host, start_viewer};
use tether_core::{RemoteControlEvent, Role};
use tether_server::SignalingService;

use crate::integration::{init_tracing, join_room, local_config, open_room, room};
use crate::utils::{
    LoopbackTransport, RecordingInjector, ScriptedCapture, eventually, wait_for_message,
    wait_for_phase, wait_for_status,
};

#[tokio::test]
async fn test_host_announces_room_and_viewer_arrival() {
    init_tracing();
    let service = SignalingService::new();
    let capture = Arc::new(ScriptedCapture::granting());
    let host = open_room(
        &service,
        &room("AB12CD"),
        capture.clone(),
        Arc::new(RecordingInjector::new()),
    )
    .await
    .unwrap();

    assert_eq!(host.role(), Role::Host);
    assert_eq!(host.room_id().as_str(), "AB12CD");
    assert!(service.rooms().contains(&room("AB12CD")));

    let viewer = join_room(&service, &room("ab12cd")).await.unwrap();
    wait_for_status(&host, "viewer present", |s| s.peer_present)
        .await
        .unwrap();
    wait_for_status(&viewer, "host present", |s| s.peer_present)
        .await
        .unwrap();

    let watched = &host;
    eventually("capture attached", || async move {
        watched.snapshot().await.attached_tracks == 1
    })
    .await
    .unwrap();
    assert!(host.snapshot().await.capturing);

    viewer.close().await;
    host.close().await;
}

#[tokio::test]
async fn test_denied_capture_attaches_nothing() {
    init_tracing();
    let service = SignalingService::new();
    let host = open_room(
        &service,
        &room("DENY01"),
        Arc::new(ScriptedCapture::failing(CaptureFailure::PermissionDenied)),
        Arc::new(RecordingInjector::new()),
    )
    .await
    .unwrap();
    let viewer = join_room(&service, &room("DENY01")).await.unwrap();

    let status = wait_for_phase(&host, SessionPhase::Failed).await.unwrap();
    assert!(status.message.starts_with("Failed to start sharing:"));
    assert!(status.message.contains("permission"));

    let snapshot = host.snapshot().await;
    assert_eq!(snapshot.attached_tracks, 0);
    assert!(!snapshot.capturing);

    // Without a stream the host never answers, so the viewer keeps waiting.
    wait_for_message(&viewer, "Waiting for host...")
        .await
        .unwrap();
    assert!(!viewer.status().connected);

    viewer.close().await;
    host.close().await;
}

#[tokio::test]
async fn test_revoked_capture_reports_stop() {
    init_tracing();
    let service = SignalingService::new();
    let capture = Arc::new(ScriptedCapture::granting());
    let host = open_room(
        &service,
        &room("STOP01"),
        capture.clone(),
        Arc::new(RecordingInjector::new()),
    )
    .await
    .unwrap();
    let viewer = join_room(&service, &room("STOP01")).await.unwrap();

    let watched = &host;
    eventually("capture running", || async move {
        watched.snapshot().await.capturing
    })
    .await
    .unwrap();

    let stream = capture.stream().unwrap();
    stream.revoke();

    eventually("capture released", || async move {
        !watched.snapshot().await.capturing
    })
    .await
    .unwrap();
    assert_eq!(host.snapshot().await.attached_tracks, 0);
    assert_eq!(stream.releases(), 1);

    host.close().await;
    assert_eq!(stream.releases(), 1);
    viewer.close().await;
}

#[tokio::test]
async fn test_host_leaving_is_reported_to_viewer() {
    init_tracing();
    let service = SignalingService::new();
    let host = open_room(
        &service,
        &room("LEAVE1"),
        Arc::new(ScriptedCapture::granting()),
        Arc::new(RecordingInjector::new()),
    )
    .await
    .unwrap();
    let viewer = join_room(&service, &room("LEAVE1")).await.unwrap();
    wait_for_status(&viewer, "host present", |s| s.peer_present)
        .await
        .unwrap();

    host.close().await;

    let status = wait_for_message(&viewer, "Host disconnected")
        .await
        .unwrap();
    assert_eq!(status.phase, SessionPhase::PeerLeft);
    assert!(!status.peer_present);
    assert!(!viewer.snapshot().await.has_stream);

    viewer.close().await;
}

#[tokio::test]
async fn test_control_after_host_left_keeps_peer_left_status() {
    init_tracing();
    let service = SignalingService::new();
    let host = open_room(
        &service,
        &room("LATE01"),
        Arc::new(ScriptedCapture::granting()),
        Arc::new(RecordingInjector::new()),
    )
    .await
    .unwrap();
    let viewer = join_room(&service, &room("LATE01")).await.unwrap();
    wait_for_status(&viewer, "host present", |s| s.peer_present)
        .await
        .unwrap();

    host.close().await;
    wait_for_message(&viewer, "Host disconnected")
        .await
        .unwrap();

    // The relay has nowhere to send this; it must not come back as an error.
    let late = RemoteControlEvent::mouse_move(1, 2);
    let _ = viewer.send_control(late).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let status = viewer.status();
    assert_eq!(status.phase, SessionPhase::PeerLeft);
    assert_eq!(status.message, "Host disconnected");

    viewer.close().await;
}

#[tokio::test]
async fn test_viewer_leaving_is_reported_to_host() {
    init_tracing();
    let service = SignalingService::new();
    let host = open_room(
        &service,
        &room("LEAVE2"),
        Arc::new(ScriptedCapture::granting()),
        Arc::new(RecordingInjector::new()),
    )
    .await
    .unwrap();
    let viewer = join_room(&service, &room("LEAVE2")).await.unwrap();
    wait_for_status(&host, "viewer present", |s| s.peer_present)
        .await
        .unwrap();

    viewer.close().await;

    let status = wait_for_message(&host, "Viewer disconnected")
        .await
        .unwrap();
    assert_eq!(status.phase, SessionPhase::PeerLeft);
    // The room stays open for the next viewer.
    assert!(service.rooms().contains(&room("LEAVE2")));

    host.close().await;
}

#[tokio::test]
async fn test_signaling_loss_mid_negotiation_keeps_resources() {
    init_tracing();
    let service = SignalingService::new();
    // A host that cannot share never answers, pinning the viewer between
    // offer and answer.
    let host = open_room(
        &service,
        &room("DROP01"),
        Arc::new(ScriptedCapture::failing(CaptureFailure::NotFound)),
        Arc::new(RecordingInjector::new()),
    )
    .await
    .unwrap();

    let transport = LoopbackTransport::new(&service);
    let viewer = start_viewer(local_config(), transport.clone(), room("DROP01"))
        .await
        .unwrap();
    wait_for_message(&viewer, "Waiting for host...")
        .await
        .unwrap();

    transport.sever().await;

    let status = wait_for_message(&viewer, "Signaling connection lost")
        .await
        .unwrap();
    assert_eq!(status.phase, SessionPhase::PeerLeft);

    let snapshot = viewer.snapshot().await;
    assert!(!snapshot.signaling_connected);
    assert!(snapshot.peer_connection);

    viewer.close().await;
    assert!(viewer.snapshot().await.is_released());
    host.close().await;
}

#[tokio::test]
async fn test_close_is_idempotent_and_releases_everything() {
    init_tracing();
    let service = SignalingService::new();
    let capture = Arc::new(ScriptedCapture::granting());
    let host = open_room(
        &service,
        &room("CLOSE1"),
        capture.clone(),
        Arc::new(RecordingInjector::new()),
    )
    .await
    .unwrap();
    let viewer = join_room(&service, &room("CLOSE1")).await.unwrap();
    let watched = &host;
    eventually("capture running", || async move {
        watched.snapshot().await.capturing
    })
    .await
    .unwrap();

    host.close().await;
    host.close().await;

    let status = host.status();
    assert_eq!(status.phase, SessionPhase::Closed);
    assert_eq!(status.message, "Session closed");
    assert!(host.snapshot().await.is_released());
    assert_eq!(capture.stream().unwrap().releases(), 1);

    viewer.close().await;
    viewer.close().await;
    assert!(viewer.snapshot().await.is_released());
    let event = RemoteControlEvent::mouse_move(1, 1);
    assert!(matches!(viewer.send_control(event).await, Err(Error::NotConnected)));

    let relay = &service;
    eventually("room removed", || async move {
        !relay.rooms().contains(&room("CLOSE1"))
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_unknown_room_fails_the_viewer() {
    init_tracing();
    let service = SignalingService::new();
    let viewer = join_room(&service, &room("NOROOM")).await.unwrap();

    let status = wait_for_phase(&viewer, SessionPhase::Failed).await.unwrap();
    assert_eq!(status.message, "Error: Room not found");

    viewer.close().await;
}

#[tokio::test]
async fn test_duplicate_room_fails_the_second_host() {
    init_tracing();
    let service = SignalingService::new();
    let first = open_room(
        &service,
        &room("TWIN01"),
        Arc::new(ScriptedCapture::granting()),
        Arc::new(RecordingInjector::new()),
    )
    .await
    .unwrap();

    let second = start_host(
        local_config(),
        LoopbackTransport::new(&service),
        HostSetup {
            capture: Arc::new(ScriptedCapture::granting()),
            injector: Arc::new(RecordingInjector::new()),
            room_id: Some(room("twin01")),
        },
    )
    .await
    .unwrap();

    let status = wait_for_phase(&second, SessionPhase::Failed).await.unwrap();
    assert_eq!(status.message, "Error: Room already exists");

    second.close().await;
    first.close().await;
}

#[tokio::test]
async fn test_refused_connect_surfaces_transport_error() {
    init_tracing();
    let service = SignalingService::new();
    let outcome = start_viewer(
        local_config(),
        LoopbackTransport::refusing(&service),
        room("ABCDEF"),
    )
    .await;

    let Err(err) = outcome else {
        panic!("connect should have been refused");
    };
    assert!(matches!(err, Error::Transport(TransportError::Refused)));
    assert_eq!(
        err.user_message(),
        "Cannot connect to signaling server. Please check if the server is running."
    );
}
