use std::cell::RefCell;

use crate::coords::Rect;
use crate::error::Result;
use crate::paint::Color;

use super::{AcceleratedImageSelection, AcceleratedStore, Command, copy_truncated};

/// In-memory backing store: a row-major `Vec<Color>`.
///
/// Mutation goes through a `RefCell`, so a CPU-backed image can be written
/// through shared references but is not `Sync`; sharing it across threads
/// needs external synchronization.
#[derive(Debug)]
pub struct CpuStore {
    width: i32,
    height: i32,
    pixels: RefCell<Vec<Color>>,
}

impl CpuStore {
    /// Transparent store of the given size. Negative extents count as zero.
    pub fn new(width: i32, height: i32) -> Self {
        let (width, height) = (width.max(0), height.max(0));
        Self {
            width,
            height,
            pixels: RefCell::new(vec![Color::TRANSPARENT; width as usize * height as usize]),
        }
    }

    /// Store initialized from a row-major sequence (truncated or zero-filled).
    pub fn from_pixels(width: i32, height: i32, pixels: &[Color]) -> Self {
        let store = Self::new(width, height);
        copy_truncated(pixels, &mut store.pixels.borrow_mut());
        store
    }

    /// Copy of the whole pixel array.
    pub fn to_vec(&self) -> Vec<Color> {
        self.pixels.borrow().clone()
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Reads `location` into an owned sample. Pixels outside the store read
    /// as transparent.
    pub(crate) fn sample(&self, location: Rect) -> CpuSource {
        let mut pixels = vec![Color::TRANSPARENT; location.area()];
        // Infallible for the CPU backend.
        let _ = self.download(location, &mut pixels);
        CpuSource { location, pixels }
    }

    fn positions(region: Rect) -> impl Iterator<Item = (i32, i32)> {
        let (w, h) = (region.width.max(0), region.height.max(0));
        (0..h).flat_map(move |j| {
            (0..w).map(move |i| (region.x.saturating_add(i), region.y.saturating_add(j)))
        })
    }
}

impl AcceleratedStore for CpuStore {
    type Target<'a> = CpuTarget<'a>;
    type Source = CpuSource;

    fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn upload(&self, region: Rect, pixels: &[Color]) -> Result<()> {
        let mut staged = vec![Color::TRANSPARENT; region.area()];
        copy_truncated(pixels, &mut staged);

        let mut store = self.pixels.borrow_mut();
        for ((x, y), color) in Self::positions(region).zip(staged) {
            if self.in_bounds(x, y) {
                store[self.index(x, y)] = color;
            }
        }
        Ok(())
    }

    fn download(&self, region: Rect, pixels: &mut [Color]) -> Result<()> {
        let store = self.pixels.borrow();
        let read: Vec<Color> = Self::positions(region)
            .take(pixels.len())
            .map(|(x, y)| {
                if self.in_bounds(x, y) {
                    store[self.index(x, y)]
                } else {
                    Color::TRANSPARENT
                }
            })
            .collect();
        copy_truncated(&read, pixels);
        Ok(())
    }

    fn modify<C>(
        &self,
        region: Rect,
        command: C,
        aux: &[AcceleratedImageSelection<'_, Self>],
    ) -> Result<()>
    where
        C: Command<Self>,
    {
        // Sample before borrowing mutably: an auxiliary region may live in
        // this very store. Nothing past this image's extent can be read.
        let sources: Vec<CpuSource> = aux
            .iter()
            .map(|a| {
                let location = a.location;
                a.store.sample(Rect::new(
                    location.x,
                    location.y,
                    location.width.min(self.width),
                    location.height.min(self.height),
                ))
            })
            .collect();

        let mut pixels = self.pixels.borrow_mut();
        let mut target = CpuTarget {
            pixels: &mut pixels[..],
            width: self.width,
            height: self.height,
            region,
        };
        command.run(&mut target, &sources);
        Ok(())
    }

    fn release(self) -> Result<()> {
        log::debug!("released {}x{} cpu store", self.width, self.height);
        Ok(())
    }

    fn read_pixel(&self, x: i32, y: i32) -> Result<Color> {
        if !self.in_bounds(x, y) {
            return Ok(Color::TRANSPARENT);
        }
        Ok(self.pixels.borrow()[self.index(x, y)])
    }

    fn write_pixel(&self, x: i32, y: i32, color: Color) -> Result<()> {
        if self.in_bounds(x, y) {
            let i = self.index(x, y);
            self.pixels.borrow_mut()[i] = color;
        }
        Ok(())
    }
}

/// Drawing handle for [`CpuStore`]: mutable access to the whole image plus
/// the region the command was issued against.
pub struct CpuTarget<'a> {
    pixels: &'a mut [Color],
    width: i32,
    height: i32,
    region: Rect,
}

impl CpuTarget<'_> {
    /// Effective region of the `modify` call.
    pub fn region(&self) -> Rect {
        self.region
    }

    /// Full extent of the underlying image.
    pub fn image_bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Transparent outside the image.
    pub fn pixel(&self, x: i32, y: i32) -> Color {
        if self.image_bounds().contains(x, y) {
            self.pixels[y as usize * self.width as usize + x as usize]
        } else {
            Color::TRANSPARENT
        }
    }

    /// No-op outside the image.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if self.image_bounds().contains(x, y) {
            self.pixels[y as usize * self.width as usize + x as usize] = color;
        }
    }

    /// Rewrites every pixel of `rect` (clipped to the image) through `f`,
    /// which receives absolute coordinates and the current color.
    pub fn map_rect(&mut self, rect: Rect, mut f: impl FnMut(i32, i32, Color) -> Color) {
        let Some(rect) = rect.intersect(self.image_bounds()) else { return };
        let stride = self.width as usize;
        for y in rect.y..rect.bottom() {
            let row = y as usize * stride;
            for x in rect.x..rect.right() {
                let i = row + x as usize;
                self.pixels[i] = f(x, y, self.pixels[i]);
            }
        }
    }
}

/// Owned copy of an auxiliary region, sampled before the command runs.
#[derive(Debug, Clone)]
pub struct CpuSource {
    location: Rect,
    pixels: Vec<Color>,
}

impl CpuSource {
    pub fn location(&self) -> Rect {
        self.location
    }

    /// Pixel at `(dx, dy)` relative to the location's origin; transparent
    /// outside the location.
    pub fn pixel(&self, dx: i32, dy: i32) -> Color {
        if dx < 0 || dy < 0 || dx >= self.location.width || dy >= self.location.height {
            return Color::TRANSPARENT;
        }
        self.pixels[dy as usize * self.location.width as usize + dx as usize]
    }
}
