pub mod graphics;

pub use graphics::{FrameSink, GraphicsDisplay};
