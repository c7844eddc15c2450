use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use webrtc::track::track_remote::TrackRemote;

/// Video-rendering collaborator the viewer binds the remote stream to.
pub trait RenderTarget<T>: Send + Sync {
    fn attach_stream(&self, stream: T);
}

struct ReceiverState<T> {
    stream: Option<T>,
    active: bool,
    target: Option<Arc<dyn RenderTarget<T>>>,
}

/// Viewer-side media endpoint. Whichever of track and render target shows up
/// second triggers the bind, so neither order loses the stream.
pub struct ScreenReceiver<T = Arc<TrackRemote>> {
    state: Mutex<ReceiverState<T>>,
}

impl<T> Default for ScreenReceiver<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(ReceiverState {
                stream: None,
                active: false,
                target: None,
            }),
        }
    }
}

impl<T: Clone + Send + 'static> ScreenReceiver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ReceiverState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_remote_track(&self, stream: T) {
        let target = {
            let mut state = self.lock();
            state.stream = Some(stream.clone());
            state.active = true;
            state.target.clone()
        };
        match target {
            Some(target) => {
                info!("Remote stream bound to render target");
                target.attach_stream(stream);
            }
            None => debug!("Remote stream arrived before a render target"),
        }
    }

    pub fn set_render_target(&self, target: Arc<dyn RenderTarget<T>>) {
        let stream = {
            let mut state = self.lock();
            state.target = Some(target.clone());
            state.stream.clone()
        };
        if let Some(stream) = stream {
            info!("Render target attached after stream, re-binding");
            target.attach_stream(stream);
        }
    }

    /// True iff a stream has arrived and is still live.
    pub fn has_stream(&self) -> bool {
        let state = self.lock();
        state.stream.is_some() && state.active
    }

    pub fn stream(&self) -> Option<T> {
        self.lock().stream.clone()
    }

    pub fn mark_inactive(&self) {
        self.lock().active = false;
    }

    /// Forgets stream and target.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.stream = None;
        state.active = false;
        state.target = None;
    }
}
