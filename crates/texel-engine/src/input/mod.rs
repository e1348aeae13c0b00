//! Input subsystem.
//!
//! Platform code translates window events into [`SurfaceEvent`]s and pushes
//! them into a screen's [`SharedEventBuffer`]; the frame loop drains them
//! before each callback.

mod buffer;
mod platform;
mod types;

pub use buffer::{EventBuffer, SharedEventBuffer};
pub use types::{MouseButton, SurfaceEvent};
