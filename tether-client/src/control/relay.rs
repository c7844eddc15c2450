use crate::error::Result;
use crate::signaling::SignalingSession;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tether_core::{RemoteControlEvent, RoomId};
use tracing::{debug, warn};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;

/// Low-latency path for control events.
#[async_trait]
pub trait ControlLink: Send + Sync {
    fn is_ready(&self) -> bool;

    async fn deliver(&self, payload: String) -> Result<()>;
}

#[async_trait]
impl ControlLink for RTCDataChannel {
    fn is_ready(&self) -> bool {
        self.ready_state() == RTCDataChannelState::Open
    }

    async fn deliver(&self, payload: String) -> Result<()> {
        self.send_text(payload).await?;
        Ok(())
    }
}

/// Path an event actually took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    DataChannel,
    Signaling,
}

/// Viewer-side sender of control events. The path is chosen per event: an
/// open data channel if there is one, the signaling relay otherwise.
pub struct ControlChannelRelay {
    link: Mutex<Option<Arc<dyn ControlLink>>>,
    signaling: SignalingSession,
    room_id: RoomId,
}

impl ControlChannelRelay {
    pub fn new(signaling: SignalingSession, room_id: RoomId) -> Self {
        Self {
            link: Mutex::new(None),
            signaling,
            room_id,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<dyn ControlLink>>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_link(&self, link: Arc<dyn ControlLink>) {
        *self.slot() = Some(link);
    }

    pub fn clear_link(&self) {
        self.slot().take();
    }

    pub fn link_ready(&self) -> bool {
        self.slot().as_ref().is_some_and(|link| link.is_ready())
    }

    pub async fn send(&self, event: &RemoteControlEvent) -> Result<Route> {
        let link = self.slot().clone();
        if let Some(link) = link.filter(|link| link.is_ready()) {
            match link.deliver(event.encode()?).await {
                Ok(()) => {
                    debug!("{} sent over data channel", event.tag());
                    return Ok(Route::DataChannel);
                }
                Err(e) => warn!("Data channel send failed, using signaling: {}", e),
            }
        }

        self.signaling
            .send_remote_control_event(&self.room_id, event.to_value()?)?;
        debug!("{} sent over signaling", event.tag());
        Ok(Route::Signaling)
    }
}
