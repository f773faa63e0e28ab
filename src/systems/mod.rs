//! Application systems
//!
//! The window and the GPU renderer, kept out of main.rs so each can be tested on its own.

mod render;
mod window;

pub use render::{FrameError, RenderSystem};
pub use window::{WindowError, WindowSystem};
