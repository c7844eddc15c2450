mod dispatcher;
mod injector;
pub mod keymap;
mod relay;

pub use dispatcher::*;
pub use injector::*;
pub use relay::*;
