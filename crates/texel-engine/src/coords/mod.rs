//! Integer pixel geometry.
//!
//! Canonical space:
//! - absolute image pixels
//! - origin top-left
//! - +X right, +Y down

mod rect;

pub use rect::Rect;
