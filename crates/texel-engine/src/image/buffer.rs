use crate::accel::{AcceleratedStore, CpuStore};
use crate::device::{GpuContext, GpuStore};
use crate::coords::Rect;
use crate::error::{Error, Result};
use crate::paint::Color;

use super::Selection;

/// Pixel buffer: a fixed size plus the store that holds the pixels.
///
/// The size never changes after creation. Backing resources are freed by
/// [`release`](Self::release); GPU textures are not reclaimed implicitly
/// until the last handle to them is gone.
#[derive(Debug)]
pub struct Image<S> {
    width: i32,
    height: i32,
    store: S,
}

impl<S: AcceleratedStore> Image<S> {
    /// Wraps an existing store; the image takes the store's size.
    pub fn with_store(store: S) -> Self {
        let (width, height) = store.size();
        Self {
            width,
            height,
            store,
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// `[0, width) x [0, height)`.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Full-extent selection.
    pub fn selection(&self) -> Selection<'_, S> {
        Selection::new(self, 0, 0, self.width, self.height)
    }

    /// Selection at `(x, y)` with the given declared size. Nothing is clamped.
    pub fn select(&self, x: i32, y: i32, width: i32, height: i32) -> Selection<'_, S> {
        Selection::new(self, x, y, width, height)
    }

    /// Frees the backing store.
    pub fn release(self) -> Result<()> {
        log::debug!("releasing {}x{} image", self.width, self.height);
        self.store.release()
    }
}

impl Image<CpuStore> {
    /// Transparent CPU-backed image.
    pub fn new_cpu(width: u32, height: u32) -> Result<Self> {
        let (w, h) = checked_size(width, height)?;
        Ok(Self::with_store(CpuStore::new(w, h)))
    }

    /// CPU-backed image initialized from a row-major pixel sequence.
    ///
    /// A short sequence leaves the tail transparent; a long one is truncated.
    pub fn from_pixels(width: u32, height: u32, pixels: &[Color]) -> Result<Self> {
        let (w, h) = checked_size(width, height)?;
        Ok(Self::with_store(CpuStore::from_pixels(w, h, pixels)))
    }
}

impl Image<GpuStore> {
    /// Transparent GPU-backed image. The texture is created on the owning
    /// thread; this call blocks until it exists.
    pub fn new_gpu(ctx: &GpuContext, width: u32, height: u32) -> Result<Self> {
        let (w, h) = checked_size(width, height)?;
        Ok(Self::with_store(GpuStore::new(ctx, w, h)?))
    }
}

/// Validates a requested image size against the signed coordinate space.
pub(crate) fn checked_size(width: u32, height: u32) -> Result<(i32, i32)> {
    let w = i32::try_from(width)
        .map_err(|_| Error::invalid_argument(format!("image width {width} out of range")))?;
    let h = i32::try_from(height)
        .map_err(|_| Error::invalid_argument(format!("image height {height} out of range")))?;
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_fixed_at_creation() {
        let image = Image::new_cpu(3, 2).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(image.bounds(), Rect::new(0, 0, 3, 2));
    }

    #[test]
    fn zero_sized_image_is_valid() {
        let image = Image::new_cpu(0, 0).unwrap();
        assert!(image.selection().is_empty());
    }

    #[test]
    fn oversized_image_fails_fast() {
        let err = Image::new_cpu(u32::MAX, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn from_pixels_zero_fills_tail() {
        let image = Image::from_pixels(2, 1, &[Color::WHITE]).unwrap();
        assert_eq!(image.store().to_vec(), vec![Color::WHITE, Color::TRANSPARENT]);
    }

    #[test]
    fn release_consumes_the_image() {
        let image = Image::new_cpu(4, 4).unwrap();
        image.release().unwrap();
    }
}
