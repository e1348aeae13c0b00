//! Accelerated command pipeline.
//!
//! A backing store implements [`AcceleratedStore`]; an operation against a
//! region of it is a [`Command`]. The same command value (a clear, a blend)
//! runs against either backend because each store supplies its own drawing
//! handle (`Target`) and its own materialized sample regions (`Source`).
//!
//! Convention:
//! - regions are absolute pixel rectangles, already clipped to the image
//! - pixel sequences are row-major, top row first

mod commands;
mod cpu;

pub use commands::{Blend, Clear, ShadePixels, blend_rect};
pub use cpu::{CpuSource, CpuStore, CpuTarget};

use crate::coords::Rect;
use crate::error::Result;
use crate::paint::Color;

/// Capability contract for the storage behind an [`Image`](crate::image::Image).
pub trait AcceleratedStore: Sized {
    /// Drawing handle a command renders through. Never outlives one call.
    type Target<'a>;

    /// Auxiliary region prepared for sampling by a command.
    type Source;

    /// Pixel extent as `(width, height)`.
    fn size(&self) -> (i32, i32);

    /// Writes `pixels` into `region`.
    ///
    /// Only `min(pixels.len(), region.area())` pixels are copied; any region
    /// pixels beyond that are zero-filled.
    fn upload(&self, region: Rect, pixels: &[Color]) -> Result<()>;

    /// Reads `region` into `pixels`.
    ///
    /// Only `min(pixels.len(), region.area())` pixels are copied; any
    /// remaining slots of `pixels` are zero-filled.
    fn download(&self, region: Rect, pixels: &mut [Color]) -> Result<()>;

    /// Runs `command` against `region` with the given auxiliary regions.
    fn modify<C>(
        &self,
        region: Rect,
        command: C,
        aux: &[AcceleratedImageSelection<'_, Self>],
    ) -> Result<()>
    where
        C: Command<Self>;

    /// Frees the backing resources.
    fn release(self) -> Result<()>;

    /// Reads one absolute pixel. Callers guarantee it is in bounds.
    fn read_pixel(&self, x: i32, y: i32) -> Result<Color> {
        let mut px = [Color::TRANSPARENT];
        self.download(Rect::new(x, y, 1, 1), &mut px)?;
        Ok(px[0])
    }

    /// Writes one absolute pixel. Callers guarantee it is in bounds.
    fn write_pixel(&self, x: i32, y: i32, color: Color) -> Result<()> {
        self.upload(Rect::new(x, y, 1, 1), &[color])
    }
}

/// One operation executed against a targeted region.
///
/// Commands are plain configuration (a fill color, a blend mode). They may
/// drive the drawing handle during [`run`](Self::run) but must not keep it.
pub trait Command<S: AcceleratedStore>: Send + 'static {
    fn run(&self, target: &mut S::Target<'_>, sources: &[S::Source]);
}

/// A store paired with an absolute location: the region a command samples.
pub struct AcceleratedImageSelection<'a, S> {
    pub store: &'a S,
    pub location: Rect,
}

impl<S> Clone for AcceleratedImageSelection<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for AcceleratedImageSelection<'_, S> {}

impl<S> std::fmt::Debug for AcceleratedImageSelection<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceleratedImageSelection")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Copies `src` into `dst` and zero-fills whatever `dst` has left over.
///
/// Returns the number of pixels copied.
pub(crate) fn copy_truncated(src: &[Color], dst: &mut [Color]) -> usize {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    dst[n..].fill(Color::TRANSPARENT);
    n
}
