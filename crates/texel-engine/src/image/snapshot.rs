//! Byte-level import/export of image contents.

use std::path::Path;

use anyhow::Context;

use crate::accel::{AcceleratedStore, CpuStore};
use crate::error::{Error, Result};
use crate::paint::Color;

use super::{Image, Selection};

impl<S: AcceleratedStore> Selection<'_, S> {
    /// Effective rectangle as tightly packed RGBA8 bytes, row-major.
    pub fn to_rgba8(&self) -> Result<Vec<u8>> {
        Ok(self.pixels()?.iter().flat_map(|c| c.to_bytes()).collect())
    }

    /// Writes the effective rectangle to `path` as PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let rect = self.effective_rect();
        if rect.is_empty() {
            return Err(Error::invalid_argument("cannot save an empty selection"));
        }

        let bytes = self.to_rgba8()?;
        ::image::save_buffer_with_format(
            path,
            &bytes,
            rect.width as u32,
            rect.height as u32,
            ::image::ColorType::Rgba8,
            ::image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;

        log::debug!("saved {}x{} snapshot to {}", rect.width, rect.height, path.display());
        Ok(())
    }
}

impl Image<CpuStore> {
    /// CPU-backed image from RGBA8 bytes. Trailing partial pixels are ignored.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let pixels: Vec<Color> = bytes
            .chunks_exact(4)
            .map(|px| Color::new(px[0], px[1], px[2], px[3]))
            .collect();
        Self::from_pixels(width, height, &pixels)
    }

    /// Decodes a PNG file into a CPU-backed image.
    pub fn load_png(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = ::image::open(path)
            .with_context(|| format!("read image '{}'", path.display()))?
            .into_rgba8();
        let (width, height) = decoded.dimensions();
        Self::from_rgba8(width, height, decoded.as_raw())
    }
}
