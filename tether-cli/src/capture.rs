use async_trait::async_trait;
use std::sync::Arc;
use tether_client::CaptureFailure;
use tether_client::media::{CaptureStream, ScreenCapture};
use tracing::info;
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Capture backend for headless hosts: a VP8 track that never carries
/// frames. Enough to negotiate and exercise remote control.
pub struct IdleCapture;

#[async_trait]
impl ScreenCapture for IdleCapture {
    async fn acquire(&self) -> Result<Arc<dyn CaptureStream>, CaptureFailure> {
        let track = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            "screen".to_owned(),
            "tether".to_owned(),
        );
        info!("Idle screen track ready");
        Ok(Arc::new(IdleStream {
            track: Arc::new(track),
        }))
    }
}

struct IdleStream {
    track: Arc<TrackLocalStaticSample>,
}

#[async_trait]
impl CaptureStream for IdleStream {
    fn video_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.track.clone()
    }

    async fn revoked(&self) {
        std::future::pending::<()>().await;
    }

    fn release(&self) {
        info!("Idle screen track released");
    }
}
