mod receiver;
mod sender;

pub use receiver::*;
pub use sender::*;
