use colored::*;
use std::sync::Arc;
use tether_client::media::RenderTarget;
use tracing::debug;
use webrtc::track::track_remote::TrackRemote;

/// Stands in for a video surface: announces the stream and drains its
/// packets so the receive pipeline keeps moving.
pub struct LoggingRenderTarget;

impl RenderTarget<Arc<TrackRemote>> for LoggingRenderTarget {
    fn attach_stream(&self, track: Arc<TrackRemote>) {
        println!(
            "{} {} ({})",
            "🖥  Receiving".green(),
            track.kind(),
            track.codec().capability.mime_type
        );
        tokio::spawn(async move {
            let mut packets: u64 = 0;
            while track.read_rtp().await.is_ok() {
                packets += 1;
                if packets % 500 == 0 {
                    debug!("{} RTP packets received", packets);
                }
            }
            debug!("Remote track ended after {} packets", packets);
        });
    }
}
