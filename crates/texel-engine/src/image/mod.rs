//! Images and selections.
//!
//! An [`Image`] owns a backing store and a fixed size. A [`Selection`] is a
//! copyable offset+size view that borrows its image: it translates local
//! coordinates, computes the effective rectangle for bulk operations, and
//! forwards commands to the store.

mod buffer;
mod line;
mod selection;
mod snapshot;

pub use buffer::Image;
pub use line::LineForWrite;
pub use selection::Selection;
