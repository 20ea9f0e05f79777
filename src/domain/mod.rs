pub mod event;
pub mod game;
pub mod phase;

pub use event::*;
pub use game::*;
pub use phase::*;
