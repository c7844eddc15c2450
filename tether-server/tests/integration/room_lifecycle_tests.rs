use std::time::Duration;
use tether_core::{PeerId, RoomId, SessionDescription, SignalMessage};
use tether_server::{RelayError, RoomCommand};
use tokio::sync::oneshot;

use crate::integration::{create_test_manager, init_tracing};
use crate::utils::next_delivery;

fn room_id() -> RoomId {
    RoomId::parse("AB12CD").unwrap()
}

async fn join(manager: &tether_server::RoomManager, viewer: &PeerId) -> Result<(), RelayError> {
    let (reply, outcome) = oneshot::channel();
    manager
        .room_sender(&room_id())
        .expect("room exists")
        .send(RoomCommand::Join {
            peer_id: viewer.clone(),
            reply,
        })
        .await
        .unwrap();
    outcome.await.unwrap()
}

#[tokio::test]
async fn test_host_is_told_room_created() {
    init_tracing();
    let (manager, _signaling, mut rx) = create_test_manager();
    let host = PeerId::new();

    manager.create_room(room_id(), host.clone()).unwrap();

    let (to, msg) = next_delivery(&mut rx).await.unwrap();
    assert_eq!(to, host);
    assert_eq!(msg, SignalMessage::RoomCreated { room_id: room_id() });
    assert!(manager.contains(&room_id()));
}

#[tokio::test]
async fn test_duplicate_room_is_rejected() {
    let (manager, _signaling, _rx) = create_test_manager();
    manager.create_room(room_id(), PeerId::new()).unwrap();

    let err = manager.create_room(room_id(), PeerId::new()).unwrap_err();
    assert_eq!(err, RelayError::RoomExists);
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn test_viewer_join_notifies_both_sides() {
    init_tracing();
    let (manager, signaling, mut rx) = create_test_manager();
    let host = PeerId::new();
    let viewer = PeerId::new();
    manager.create_room(room_id(), host.clone()).unwrap();
    next_delivery(&mut rx).await.unwrap();

    join(&manager, &viewer).await.unwrap();

    assert_eq!(
        signaling.delivered_to(&host).await.last(),
        Some(&SignalMessage::ViewerJoined { room_id: room_id() })
    );
    assert_eq!(
        signaling.delivered_to(&viewer).await,
        vec![SignalMessage::RoomJoined { room_id: room_id() }]
    );
}

#[tokio::test]
async fn test_second_viewer_is_rejected() {
    let (manager, signaling, _rx) = create_test_manager();
    manager.create_room(room_id(), PeerId::new()).unwrap();
    join(&manager, &PeerId::new()).await.unwrap();

    let late = PeerId::new();
    assert_eq!(join(&manager, &late).await, Err(RelayError::RoomFull));
    assert!(signaling.delivered_to(&late).await.is_empty());
}

#[tokio::test]
async fn test_forward_is_stamped_with_sender() {
    init_tracing();
    let (manager, signaling, _rx) = create_test_manager();
    let host = PeerId::new();
    let viewer = PeerId::new();
    manager.create_room(room_id(), host.clone()).unwrap();
    join(&manager, &viewer).await.unwrap();

    manager
        .room_sender(&room_id())
        .unwrap()
        .send(RoomCommand::Forward {
            from: viewer.clone(),
            msg: SignalMessage::Offer {
                room_id: Some(room_id()),
                offer: SessionDescription::offer("v=0"),
                from: None,
            },
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        signaling.delivered_to(&host).await.last(),
        Some(&SignalMessage::Offer {
            room_id: None,
            offer: SessionDescription::offer("v=0"),
            from: Some(viewer),
        })
    );
}

#[tokio::test]
async fn test_host_leaving_closes_room() {
    init_tracing();
    let (manager, signaling, _rx) = create_test_manager();
    let host = PeerId::new();
    let viewer = PeerId::new();
    manager.create_room(room_id(), host.clone()).unwrap();
    join(&manager, &viewer).await.unwrap();

    manager
        .room_sender(&room_id())
        .unwrap()
        .send(RoomCommand::Leave { peer_id: host })
        .await
        .unwrap();

    for _ in 0..40 {
        if !manager.contains(&room_id()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(manager.is_empty());
    assert_eq!(
        signaling.delivered_to(&viewer).await.last(),
        Some(&SignalMessage::PeerDisconnected { room_id: room_id() })
    );

    // The id is free again.
    manager.create_room(room_id(), PeerId::new()).unwrap();
}
