mod handle;
mod orchestrator;
mod status;

pub use handle::*;
pub use orchestrator::{CONTROL_CHANNEL_LABEL, HostSetup, start_host, start_viewer};
pub use status::*;
