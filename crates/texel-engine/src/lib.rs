//! Texel engine crate.
//!
//! Hardware-abstracted pixel images: CPU or GPU backed, edited through
//! clipped selections and commands, with GPU work marshaled to the single
//! thread that owns the graphics context.

pub mod accel;
pub mod coords;
pub mod device;
pub mod error;
pub mod executor;
pub mod image;
pub mod input;
pub mod logging;
pub mod paint;
pub mod screen;
pub mod time;

pub use error::{Error, Result};
