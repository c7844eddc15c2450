use crate::error::{CaptureFailure, Result};
use crate::peer::{CallbackSlot, PeerConnection, TrackAttachment};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webrtc::track::track_local::TrackLocal;

/// Screen-capture collaborator: hands out one live video stream per request.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn acquire(&self) -> std::result::Result<Arc<dyn CaptureStream>, CaptureFailure>;
}

/// A granted capture, owning exactly one video track.
#[async_trait]
pub trait CaptureStream: Send + Sync {
    fn video_track(&self) -> Arc<dyn TrackLocal + Send + Sync>;

    /// Resolves once the platform ends the capture on its own, e.g. the user
    /// pressed "stop sharing" in an OS control.
    async fn revoked(&self);

    /// Releases the capture device. Must tolerate repeated calls.
    fn release(&self);
}

/// Why the sender stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    Stopped,
    Revoked,
}

struct ActiveCapture {
    stream: Arc<dyn CaptureStream>,
    attachment: TrackAttachment,
    watcher: JoinHandle<()>,
}

type StoppedCallback = dyn Fn(StopCause) + Send + Sync;

struct SenderShared {
    active: Mutex<Option<ActiveCapture>>,
    on_stopped: CallbackSlot<StoppedCallback>,
}

impl SenderShared {
    /// The one teardown path for both programmatic and platform stops.
    async fn teardown(&self, cause: StopCause) {
        let Some(capture) = self.active.lock().await.take() else {
            return;
        };
        if cause == StopCause::Stopped {
            capture.watcher.abort();
        }
        capture.stream.release();
        if let Err(e) = capture.attachment.detach().await {
            debug!("Track detach after stop: {}", e);
        }
        info!("Screen capture stopped ({:?})", cause);

        if let Some(callback) = self.on_stopped.get() {
            callback(cause);
        }
    }
}

/// Host-side media endpoint: puts the shared screen on a peer connection.
pub struct ScreenSender {
    capture: Arc<dyn ScreenCapture>,
    shared: Arc<SenderShared>,
}

impl ScreenSender {
    pub fn new(capture: Arc<dyn ScreenCapture>) -> Self {
        Self {
            capture,
            shared: Arc::new(SenderShared {
                active: Mutex::new(None),
                on_stopped: CallbackSlot::default(),
            }),
        }
    }

    /// Called after every stop, whichever side initiated it.
    pub fn on_stopped(&self, callback: impl Fn(StopCause) + Send + Sync + 'static) {
        self.shared.on_stopped.set(Arc::new(callback));
    }

    /// Acquires the screen and attaches its track to `peer`. Nothing is
    /// attached when acquisition fails.
    pub async fn start(&self, peer: &PeerConnection) -> Result<()> {
        let mut active = self.shared.active.lock().await;
        if active.is_some() {
            warn!("Screen capture already running");
            return Ok(());
        }

        let stream = self.capture.acquire().await?;
        let attachment = match peer.attach_track(stream.video_track()).await {
            Ok(attachment) => attachment,
            Err(e) => {
                stream.release();
                return Err(e);
            }
        };

        let watcher = tokio::spawn({
            let stream = stream.clone();
            let shared = Arc::downgrade(&self.shared);
            async move {
                stream.revoked().await;
                if let Some(shared) = shared.upgrade() {
                    shared.teardown(StopCause::Revoked).await;
                }
            }
        });

        *active = Some(ActiveCapture {
            stream,
            attachment,
            watcher,
        });
        info!("Screen capture attached");
        Ok(())
    }

    /// Releases the capture and detaches the track. Idempotent.
    pub async fn stop(&self) {
        self.shared.teardown(StopCause::Stopped).await;
    }

    pub async fn is_capturing(&self) -> bool {
        self.shared.active.lock().await.is_some()
    }
}
