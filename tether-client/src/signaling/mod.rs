mod session;
mod transport;
mod ws_transport;

pub use session::*;
pub use transport::*;
pub use ws_transport::*;

#[cfg(test)]
pub(crate) use transport::recording;
