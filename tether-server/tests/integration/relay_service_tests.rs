use serde_json::json;
use std::time::Duration;
use tether_core::{RoomId, SignalKind, SignalMessage};
use tether_server::SignalingService;

use crate::integration::{connect_peer, init_tracing};
use crate::utils::{assert_silent, expect_kind, next_signal};

fn room_id() -> RoomId {
    RoomId::parse("ROOM01").unwrap()
}

fn code(raw: &str) -> RoomId {
    RoomId::parse(raw).unwrap()
}

fn create(raw: &str) -> SignalMessage {
    SignalMessage::CreateRoom { room_id: code(raw) }
}

fn join(raw: &str) -> SignalMessage {
    SignalMessage::JoinRoom { room_id: code(raw) }
}

fn error_text(msg: SignalMessage) -> String {
    match msg {
        SignalMessage::Error { message } => message,
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_unknown_room_reports_not_found() {
    init_tracing();
    let service = SignalingService::new();
    let (viewer, mut rx) = connect_peer(&service);

    service
        .handle_signal(&viewer, SignalMessage::JoinRoom { room_id: room_id() })
        .await;

    assert_eq!(
        error_text(next_signal(&mut rx).await.unwrap()),
        "Room not found"
    );
    assert_eq!(service.room_of(&viewer), None);
}

#[tokio::test]
async fn test_third_peer_sees_room_full() {
    let service = SignalingService::new();
    let (host, mut host_rx) = connect_peer(&service);
    let (viewer, mut viewer_rx) = connect_peer(&service);
    let (late, mut late_rx) = connect_peer(&service);

    service
        .handle_signal(&host, SignalMessage::CreateRoom { room_id: room_id() })
        .await;
    expect_kind(&mut host_rx, SignalKind::RoomCreated)
        .await
        .unwrap();

    service
        .handle_signal(&viewer, SignalMessage::JoinRoom { room_id: room_id() })
        .await;
    expect_kind(&mut viewer_rx, SignalKind::RoomJoined)
        .await
        .unwrap();
    expect_kind(&mut host_rx, SignalKind::ViewerJoined)
        .await
        .unwrap();

    service
        .handle_signal(&late, SignalMessage::JoinRoom { room_id: room_id() })
        .await;
    assert_eq!(
        error_text(next_signal(&mut late_rx).await.unwrap()),
        "Room is full"
    );
    assert_eq!(service.room_of(&late), None);
}

#[tokio::test]
async fn test_duplicate_create_reports_exists() {
    let service = SignalingService::new();
    let (first, _first_rx) = connect_peer(&service);
    let (second, mut second_rx) = connect_peer(&service);

    service
        .handle_signal(&first, SignalMessage::CreateRoom { room_id: room_id() })
        .await;
    service
        .handle_signal(&second, SignalMessage::CreateRoom { room_id: room_id() })
        .await;

    assert_eq!(
        error_text(next_signal(&mut second_rx).await.unwrap()),
        "Room already exists"
    );
}

#[tokio::test]
async fn test_forward_outside_room_is_dropped_silently() {
    let service = SignalingService::new();
    let (peer, mut rx) = connect_peer(&service);

    service
        .handle_signal(
            &peer,
            SignalMessage::RemoteControlEvent {
                room_id: Some(room_id()),
                event: json!({"type": "mousemove", "x": 1, "y": 1}),
                from: None,
            },
        )
        .await;

    assert_silent(&mut rx).await;
}

#[tokio::test]
async fn test_late_frames_after_host_left_are_not_bounced() {
    init_tracing();
    let service = SignalingService::new();
    let (host, mut host_rx) = connect_peer(&service);
    let (viewer, mut viewer_rx) = connect_peer(&service);

    service
        .handle_signal(&host, SignalMessage::CreateRoom { room_id: room_id() })
        .await;
    service
        .handle_signal(&viewer, SignalMessage::JoinRoom { room_id: room_id() })
        .await;
    expect_kind(&mut viewer_rx, SignalKind::RoomJoined)
        .await
        .unwrap();
    expect_kind(&mut host_rx, SignalKind::ViewerJoined)
        .await
        .unwrap();

    service.remove_peer(&host).await;
    expect_kind(&mut viewer_rx, SignalKind::PeerDisconnected)
        .await
        .unwrap();

    for _ in 0..40 {
        if !service.rooms().contains(&room_id()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    service
        .handle_signal(
            &viewer,
            SignalMessage::RemoteControlEvent {
                room_id: Some(room_id()),
                event: json!({"type": "mousemove", "x": 1, "y": 2}),
                from: None,
            },
        )
        .await;

    assert_silent(&mut viewer_rx).await;
}

#[tokio::test]
async fn test_second_create_on_same_socket_is_rejected() {
    let service = SignalingService::new();
    let (host, mut host_rx) = connect_peer(&service);

    service.handle_signal(&host, create("LEAKAA")).await;
    expect_kind(&mut host_rx, SignalKind::RoomCreated)
        .await
        .unwrap();
    service.handle_signal(&host, create("LEAKBB")).await;

    assert_eq!(
        error_text(next_signal(&mut host_rx).await.unwrap()),
        "Already in a room"
    );
    assert!(!service.rooms().contains(&code("LEAKBB")));
    assert_eq!(service.room_of(&host), Some(code("LEAKAA")));

    service.remove_peer(&host).await;
    for _ in 0..40 {
        if service.rooms().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(service.rooms().is_empty());
}

#[tokio::test]
async fn test_seated_viewer_cannot_join_another_room() {
    let service = SignalingService::new();
    let (host_a, _host_a_rx) = connect_peer(&service);
    let (host_b, _host_b_rx) = connect_peer(&service);
    let (viewer, mut viewer_rx) = connect_peer(&service);

    service.handle_signal(&host_a, create("ROOMAA")).await;
    service.handle_signal(&host_b, create("ROOMBB")).await;
    service.handle_signal(&viewer, join("ROOMAA")).await;
    expect_kind(&mut viewer_rx, SignalKind::RoomJoined)
        .await
        .unwrap();

    service.handle_signal(&viewer, join("ROOMBB")).await;
    assert_eq!(
        error_text(next_signal(&mut viewer_rx).await.unwrap()),
        "Already in a room"
    );
    assert_eq!(service.room_of(&viewer), Some(code("ROOMAA")));
}

#[tokio::test]
async fn test_control_event_reaches_host_and_viewer_leave_is_announced() {
    init_tracing();
    let service = SignalingService::new();
    let (host, mut host_rx) = connect_peer(&service);
    let (viewer, mut viewer_rx) = connect_peer(&service);

    service
        .handle_signal(&host, SignalMessage::CreateRoom { room_id: room_id() })
        .await;
    service
        .handle_signal(&viewer, SignalMessage::JoinRoom { room_id: room_id() })
        .await;
    expect_kind(&mut viewer_rx, SignalKind::RoomJoined)
        .await
        .unwrap();
    expect_kind(&mut host_rx, SignalKind::ViewerJoined)
        .await
        .unwrap();

    let event = json!({"type": "mousemove", "x": 100, "y": 200});
    service
        .handle_signal(
            &viewer,
            SignalMessage::RemoteControlEvent {
                room_id: Some(room_id()),
                event: event.clone(),
                from: None,
            },
        )
        .await;

    match next_signal(&mut host_rx).await.unwrap() {
        SignalMessage::RemoteControlEvent {
            event: got, from, ..
        } => {
            assert_eq!(got, event);
            assert_eq!(from, Some(viewer.clone()));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_silent(&mut viewer_rx).await;

    service.remove_peer(&viewer).await;
    assert_eq!(
        next_signal(&mut host_rx).await.unwrap(),
        SignalMessage::PeerDisconnected { room_id: room_id() }
    );
    assert!(service.rooms().contains(&room_id()));
}
