pub mod display;
pub mod framebuffer;

pub use display::{DisplayError, SharpDisplay};
pub use framebuffer::FrameBuffer;
