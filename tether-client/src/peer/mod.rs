mod callback_slot;
mod candidate_queue;
mod connection;

pub(crate) use callback_slot::CallbackSlot;
pub use candidate_queue::*;
pub use connection::*;
