mod room;
mod signaling;

pub use room::*;
pub use signaling::*;

use tokio::net::TcpListener;
use tracing::info;

/// Serves the relay on an already bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, service: SignalingService) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Signaling relay listening on {}", addr);
    }
    axum::serve(listener, router(service)).await
}
