pub mod frame_view;
pub mod game_loop;

pub use game_loop::{GameLoop, LoopError, LoopHandle, LoopSnapshot, LoopState, LoopStats};
