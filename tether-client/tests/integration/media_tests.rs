use std::sync::Arc;
use std::time::Duration;
use tether_client::SessionPhase;
use tether_client::control::{MouseInput, Route};
use tether_core::RemoteControlEvent;
use tether_server::SignalingService;

use crate::integration::{init_tracing, join_room, open_room, room};
use crate::utils::{
    CountingTarget, RecordingInjector, ScriptedCapture, eventually, wait_for_message,
    wait_for_status,
};

#[tokio::test]
async fn test_pair_connects_and_control_rides_data_channel() {
    init_tracing();
    let service = SignalingService::new();
    let injector = Arc::new(RecordingInjector::new());
    let host = open_room(
        &service,
        &room("HAPPY1"),
        Arc::new(ScriptedCapture::granting()),
        injector.clone(),
    )
    .await
    .unwrap();
    let viewer = join_room(&service, &room("HAPPY1")).await.unwrap();

    let status = wait_for_status(&host, "host connected", |s| s.connected)
        .await
        .unwrap();
    assert_eq!(status.phase, SessionPhase::Connected);
    assert_eq!(status.message, "Screen sharing active");
    wait_for_status(&viewer, "viewer connected", |s| s.connected)
        .await
        .unwrap();

    let probe = &viewer;
    eventually("control channel open", || async move {
        probe.snapshot().await.data_channel_open
    })
    .await
    .unwrap();

    let route = viewer
        .send_control(RemoteControlEvent::mouse_move(100, 200))
        .await
        .unwrap();
    assert_eq!(route, Route::DataChannel);

    let probe = &injector;
    eventually("injection", || async move { probe.total() > 0 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(injector.mouse(), vec![MouseInput::Move { x: 100, y: 200 }]);

    viewer.close().await;
    host.close().await;
}

#[tokio::test]
async fn test_remote_track_binds_late_render_target_once() {
    init_tracing();
    let service = SignalingService::new();
    let capture = Arc::new(ScriptedCapture::granting());
    let host = open_room(
        &service,
        &room("TRACK1"),
        capture.clone(),
        Arc::new(RecordingInjector::new()),
    )
    .await
    .unwrap();
    let stream = capture.stream().unwrap();
    stream.start_frames();

    let viewer = join_room(&service, &room("TRACK1")).await.unwrap();
    let probe = &viewer;
    eventually("remote stream", || async move {
        probe.snapshot().await.has_stream
    })
    .await
    .unwrap();
    wait_for_status(&viewer, "stream status", |s| {
        s.phase == SessionPhase::Connected && s.message == "Receiving stream..."
    })
    .await
    .unwrap();

    let target = Arc::new(CountingTarget::default());
    viewer.attach_render_target(target.clone());
    let bound = &target;
    eventually("late bind", || async move { bound.binds() > 0 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(target.binds(), 1);

    host.close().await;
    let status = wait_for_message(&viewer, "Host disconnected")
        .await
        .unwrap();
    assert_eq!(status.phase, SessionPhase::PeerLeft);
    assert!(!viewer.snapshot().await.has_stream);
    assert_eq!(stream.releases(), 1);

    viewer.close().await;
}
