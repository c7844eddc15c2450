mod relay_error;
mod room;
mod room_command;
mod room_manager;
mod room_slots;

pub use relay_error::*;
pub use room::*;
pub use room_command::*;
pub use room_manager::*;
pub use room_slots::*;
