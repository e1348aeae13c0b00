//! Pixel values and compositing.
//!
//! Stored colors are 8-bit straight alpha. Compositing math runs in
//! normalized `[0, 1]` space and is shared by the CPU backend and the blend
//! states handed to wgpu pipelines.

mod blend;
mod color;

pub use blend::BlendMode;
pub use color::Color;
