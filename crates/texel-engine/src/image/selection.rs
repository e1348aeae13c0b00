use crate::accel::{AcceleratedImageSelection, AcceleratedStore, Command};
use crate::coords::Rect;
use crate::error::Result;
use crate::paint::Color;

use super::{Image, LineForWrite};

/// Offset+size view onto an [`Image`].
///
/// Offset and size are taken as given: they may be negative or exceed the
/// image. Single-pixel access translates local coordinates by the offset and
/// is gated only by the image bounds, not by the declared size. Bulk
/// operations act on the [effective rectangle](Self::effective_rect).
pub struct Selection<'a, S> {
    image: &'a Image<S>,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl<S> Clone for Selection<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Selection<'_, S> {}

impl<S> std::fmt::Debug for Selection<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl<'a, S: AcceleratedStore> Selection<'a, S> {
    #[inline]
    pub fn new(image: &'a Image<S>, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            image,
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn image(&self) -> &'a Image<S> {
        self.image
    }

    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Declared rectangle in absolute image coordinates.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Same offset, new declared size. No clamping.
    #[inline]
    pub fn with_size(self, width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    /// Nested selection whose offset is relative to this one.
    #[inline]
    pub fn sub_selection(self, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(
            self.image,
            self.x.saturating_add(x),
            self.y.saturating_add(y),
            width,
            height,
        )
    }

    /// Declared rectangle intersected with the image bounds; zero-sized when
    /// they do not overlap.
    #[inline]
    pub fn effective_rect(&self) -> Rect {
        self.bounds().clip_to(self.image.bounds())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.effective_rect().is_empty()
    }

    #[inline]
    fn absolute(&self, local_x: i32, local_y: i32) -> Option<(i32, i32)> {
        let ax = self.x.checked_add(local_x)?;
        let ay = self.y.checked_add(local_y)?;
        self.image.bounds().contains(ax, ay).then_some((ax, ay))
    }

    /// Pixel at local `(x, y)`; transparent when the absolute coordinate is
    /// outside the image.
    ///
    /// A backend failure is logged and read as transparent; use
    /// [`try_color`](Self::try_color) to observe it.
    pub fn color(&self, local_x: i32, local_y: i32) -> Color {
        self.try_color(local_x, local_y).unwrap_or_else(|e| {
            log::warn!("pixel read failed: {e}");
            Color::TRANSPARENT
        })
    }

    pub fn try_color(&self, local_x: i32, local_y: i32) -> Result<Color> {
        match self.absolute(local_x, local_y) {
            Some((x, y)) => self.image.store().read_pixel(x, y),
            None => Ok(Color::TRANSPARENT),
        }
    }

    /// Stores `color` at local `(x, y)` (last write wins); no-op when the
    /// absolute coordinate is outside the image.
    ///
    /// A backend failure is logged; use [`try_set_color`](Self::try_set_color)
    /// to observe it.
    pub fn set_color(&self, local_x: i32, local_y: i32, color: Color) {
        if let Err(e) = self.try_set_color(local_x, local_y, color) {
            log::warn!("pixel write failed: {e}");
        }
    }

    pub fn try_set_color(&self, local_x: i32, local_y: i32, color: Color) -> Result<()> {
        match self.absolute(local_x, local_y) {
            Some((x, y)) => self.image.store().write_pixel(x, y, color),
            None => Ok(()),
        }
    }

    /// Writable copy of local row `row`, `width` pixels long.
    ///
    /// Changes land in the image when the returned guard is committed or
    /// dropped. Rows outside the declared height give a zero-length line.
    pub fn line_for_write(&self, row: i32) -> LineForWrite<'a, S> {
        LineForWrite::open(*self, row)
    }

    /// Read-only copy of local row `row`; same extent rules as
    /// [`line_for_write`](Self::line_for_write).
    pub fn line(&self, row: i32) -> Vec<Color> {
        LineForWrite::open(*self, row).into_pixels()
    }

    /// Writes a row-major sequence over the effective rectangle.
    pub fn upload(&self, pixels: &[Color]) -> Result<()> {
        let region = self.effective_rect();
        if region.is_empty() {
            return Ok(());
        }
        self.image.store().upload(region, pixels)
    }

    /// Reads the effective rectangle into `pixels`, zero-filling any slack.
    pub fn download(&self, pixels: &mut [Color]) -> Result<()> {
        let region = self.effective_rect();
        if region.is_empty() {
            pixels.fill(Color::TRANSPARENT);
            return Ok(());
        }
        self.image.store().download(region, pixels)
    }

    /// Pixels of the effective rectangle, row-major.
    pub fn pixels(&self) -> Result<Vec<Color>> {
        let mut out = vec![Color::TRANSPARENT; self.effective_rect().area()];
        self.download(&mut out)?;
        Ok(out)
    }

    /// Runs `command` against the effective rectangle.
    ///
    /// Each auxiliary selection becomes a sample region aligned to the
    /// target: when clipping moves the target origin, the auxiliary offsets
    /// move by the same amount. An empty effective rectangle is a no-op.
    pub fn modify<C>(&self, command: C, aux: &[Selection<'_, S>]) -> Result<()>
    where
        C: Command<S>,
    {
        let region = self.effective_rect();
        if region.is_empty() {
            return Ok(());
        }

        let dx = region.x.saturating_sub(self.x);
        let dy = region.y.saturating_sub(self.y);
        let sources: Vec<AcceleratedImageSelection<'_, S>> = aux
            .iter()
            .map(|s| AcceleratedImageSelection {
                store: s.image.store(),
                location: Rect::new(
                    s.x.saturating_add(dx),
                    s.y.saturating_add(dy),
                    s.width.saturating_sub(dx),
                    s.height.saturating_sub(dy),
                ),
            })
            .collect();

        self.image.store().modify(region, command, &sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::accel::{Blend, Clear, CpuStore, ShadePixels};
    use crate::paint::BlendMode;

    fn red() -> Color {
        Color::opaque(255, 0, 0)
    }

    fn blue() -> Color {
        Color::opaque(0, 0, 255)
    }

    #[test]
    fn basic_pixel_set() {
        let image = Image::new_cpu(2, 2).unwrap();
        let sel = image.selection();

        sel.set_color(0, 1, Color::WHITE);
        assert_eq!(sel.color(0, 1), Color::WHITE);
        assert_eq!(sel.color(1, 1), Color::TRANSPARENT);
    }

    #[test]
    fn reads_outside_image_are_transparent() {
        let image = Image::from_pixels(3, 3, &[red(); 9]).unwrap();
        for sel in [
            image.select(0, 0, 3, 3),
            image.select(2, 2, 1, 1),
            image.select(-5, 7, 2, 2),
        ] {
            for (lx, ly) in [(-10, 0), (0, -10), (10, 0), (0, 10), (-1, -1)] {
                let (ax, ay) = (sel.x() + lx, sel.y() + ly);
                if !image.bounds().contains(ax, ay) {
                    assert_eq!(sel.color(lx, ly), Color::TRANSPARENT, "({ax}, {ay})");
                }
            }
        }
    }

    #[test]
    fn writes_outside_image_are_ignored() {
        let image = Image::new_cpu(2, 2).unwrap();
        let sel = image.select(1, 1, 1, 1);
        sel.set_color(1, 0, red());
        sel.set_color(-2, 0, red());
        assert!(image.store().to_vec().iter().all(|c| c.is_transparent()));
    }

    #[test]
    fn write_read_round_trip_in_bounds() {
        let image = Image::new_cpu(4, 3).unwrap();
        let sel = image.select(1, 1, 2, 2);
        for y in -1..2 {
            for x in -1..3 {
                let c = Color::new(x as u8, y as u8, 7, 255);
                sel.set_color(x, y, c);
                assert_eq!(sel.color(x, y), c);
            }
        }
    }

    #[test]
    fn reads_are_not_gated_by_declared_size() {
        let image = Image::new_cpu(2, 2).unwrap();
        image.selection().set_color(0, 1, Color::WHITE);
        image.selection().set_color(1, 1, Color::WHITE);

        let sel = image.select(1, 1, 1, 1);
        assert_eq!(sel.color(-1, 0), Color::WHITE);
        assert_eq!(sel.color(0, 0), Color::WHITE);
        assert_eq!(sel.color(1, 0), Color::TRANSPARENT);
    }

    #[test]
    fn with_size_keeps_offset_and_does_not_clamp() {
        let image = Image::new_cpu(2, 2).unwrap();
        let sel = image.select(1, 1, 1, 1).with_size(10, 10);
        assert_eq!(sel.bounds(), Rect::new(1, 1, 10, 10));
        assert_eq!(sel.effective_rect(), Rect::new(1, 1, 1, 1));
    }

    #[test]
    fn effective_rect_of_disjoint_selection_is_empty() {
        let image = Image::new_cpu(2, 2).unwrap();
        assert!(image.select(5, 5, 2, 2).is_empty());
        assert!(image.select(0, 0, -1, 2).is_empty());
    }

    #[test]
    fn sub_selection_composes_offsets() {
        let image = Image::new_cpu(8, 8).unwrap();
        let inner = image.select(2, 3, 4, 4).sub_selection(1, -1, 2, 2);
        assert_eq!(inner.bounds(), Rect::new(3, 2, 2, 2));
    }

    #[test]
    fn modify_on_empty_region_is_a_no_op() {
        let image = Image::new_cpu(2, 2).unwrap();
        image.select(3, 3, 2, 2).modify(Clear(red()), &[]).unwrap();
        assert!(image.store().to_vec().iter().all(|c| c.is_transparent()));
    }

    #[test]
    fn clear_is_clipped_to_effective_rect() {
        let image = Image::new_cpu(3, 2).unwrap();
        image.select(-1, 1, 3, 5).modify(Clear(red()), &[]).unwrap();
        assert_eq!(
            image.store().to_vec(),
            vec![
                Color::TRANSPARENT,
                Color::TRANSPARENT,
                Color::TRANSPARENT,
                red(),
                red(),
                Color::TRANSPARENT,
            ]
        );
    }

    #[test]
    fn source_blend_copies_alpha_and_clamps_to_image() {
        let target = Image::new_cpu(3, 3).unwrap();
        target.selection().modify(Clear(blue()), &[]).unwrap();

        let src_pixels = [Color::new(9, 9, 9, 0); 16];
        let source = Image::from_pixels(4, 4, &src_pixels).unwrap();

        target
            .select(1, 1, 1, 1)
            .modify(Blend::source(), &[source.selection()])
            .unwrap();

        // Source is 4x4 but only 2x2 remain from (1, 1).
        let out = target.store().to_vec();
        for y in 0..3 {
            for x in 0..3 {
                let expected = if x >= 1 && y >= 1 {
                    Color::new(9, 9, 9, 0)
                } else {
                    blue()
                };
                assert_eq!(out[(y * 3 + x) as usize], expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn source_over_with_transparent_source_is_identity() {
        let target = Image::from_pixels(
            2,
            2,
            &[red(), blue(), Color::new(1, 2, 3, 4), Color::TRANSPARENT],
        )
        .unwrap();
        let before = target.store().to_vec();

        let source = Image::from_pixels(2, 2, &[Color::new(200, 100, 50, 0); 4]).unwrap();
        target
            .selection()
            .modify(Blend::source_over(), &[source.selection()])
            .unwrap();

        assert_eq!(target.store().to_vec(), before);
    }

    #[test]
    fn source_over_blends_half_alpha() {
        let target = Image::from_pixels(1, 1, &[Color::BLACK]).unwrap();
        let source = Image::from_pixels(1, 1, &[Color::new(255, 255, 255, 128)]).unwrap();
        target
            .selection()
            .modify(Blend(BlendMode::SourceOver), &[source.selection()])
            .unwrap();
        assert_eq!(target.selection().color(0, 0), Color::WHITE);
    }

    #[test]
    fn aux_selection_at_extreme_offset_is_harmless() {
        let target = Image::from_pixels(2, 1, &[red(), blue()]).unwrap();
        let source = Image::from_pixels(1, 1, &[Color::WHITE]).unwrap();
        target
            .select(-1, 0, 3, 1)
            .modify(Blend::source(), &[source.select(i32::MAX, 0, 1, 1)])
            .unwrap();
        assert_eq!(target.store().to_vec(), vec![red(), blue()]);
    }

    #[test]
    fn aux_selection_with_huge_extent_is_bounded_by_target() {
        let target = Image::new_cpu(2, 1).unwrap();
        let source = Image::from_pixels(2, 1, &[red(), blue()]).unwrap();
        target
            .select(i32::MIN, 0, i32::MAX, 1)
            .modify(Clear(Color::WHITE), &[])
            .unwrap();
        target
            .selection()
            .modify(Blend::source(), &[source.select(0, 0, i32::MAX, i32::MAX)])
            .unwrap();
        assert_eq!(target.store().to_vec(), vec![red(), blue()]);
    }

    #[test]
    fn blend_within_one_image() {
        let image = Image::from_pixels(
            4,
            1,
            &[red(), blue(), Color::TRANSPARENT, Color::TRANSPARENT],
        )
        .unwrap();
        let left = image.select(0, 0, 2, 1);
        image.select(2, 0, 2, 1).modify(Blend::source(), &[left]).unwrap();
        assert_eq!(image.store().to_vec(), vec![red(), blue(), red(), blue()]);
    }

    #[test]
    fn clipped_target_shifts_source_alignment() {
        let target = Image::new_cpu(2, 1).unwrap();
        let source = Image::from_pixels(3, 1, &[red(), blue(), Color::WHITE]).unwrap();

        // Target starts one pixel left of the image; source column 0 falls off.
        target
            .select(-1, 0, 3, 1)
            .modify(Blend::source(), &[source.selection()])
            .unwrap();
        assert_eq!(target.store().to_vec(), vec![blue(), Color::WHITE]);
    }

    #[test]
    fn shade_pixels_gets_local_coordinates() {
        let image = Image::new_cpu(3, 3).unwrap();
        image
            .select(1, 1, 2, 2)
            .modify(ShadePixels(|x, y, _| Color::new(x as u8, y as u8, 0, 255)), &[])
            .unwrap();
        assert_eq!(image.selection().color(2, 2), Color::new(1, 1, 0, 255));
        assert_eq!(image.selection().color(0, 0), Color::TRANSPARENT);
    }

    #[test]
    fn upload_and_download_use_effective_rect() {
        let image = Image::new_cpu(3, 2).unwrap();
        let sel = image.select(1, 0, 5, 5);
        sel.upload(&[red(), blue(), Color::WHITE, Color::BLACK]).unwrap();

        let mut out = [Color::TRANSPARENT; 6];
        sel.download(&mut out).unwrap();
        assert_eq!(
            out,
            [
                red(),
                blue(),
                Color::WHITE,
                Color::BLACK,
                Color::TRANSPARENT,
                Color::TRANSPARENT
            ]
        );
        assert_eq!(image.selection().color(0, 0), Color::TRANSPARENT);
    }

    #[test]
    fn line_reads_are_declared_width() {
        let image = Image::from_pixels(2, 1, &[red(), blue()]).unwrap();
        let line = image.select(1, 0, 3, 1).line(0);
        assert_eq!(line, vec![blue(), Color::TRANSPARENT, Color::TRANSPARENT]);
        assert!(image.selection().line(5).is_empty());
    }

    /// CPU store that counts bulk transfers.
    struct CountingStore {
        inner: CpuStore,
        downloads: Cell<usize>,
        uploads: Cell<usize>,
    }

    impl AcceleratedStore for CountingStore {
        type Target<'a> = ();
        type Source = ();

        fn size(&self) -> (i32, i32) {
            self.inner.size()
        }

        fn upload(&self, region: Rect, pixels: &[Color]) -> Result<()> {
            self.uploads.set(self.uploads.get() + 1);
            self.inner.upload(region, pixels)
        }

        fn download(&self, region: Rect, pixels: &mut [Color]) -> Result<()> {
            self.downloads.set(self.downloads.get() + 1);
            self.inner.download(region, pixels)
        }

        fn modify<C>(
            &self,
            _: Rect,
            _: C,
            _: &[AcceleratedImageSelection<'_, Self>],
        ) -> Result<()>
        where
            C: Command<Self>,
        {
            Ok(())
        }

        fn release(self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn line_is_one_download_and_no_write_back() {
        let image = Image::with_store(CountingStore {
            inner: CpuStore::from_pixels(3, 1, &[red(), blue(), Color::WHITE]),
            downloads: Cell::new(0),
            uploads: Cell::new(0),
        });

        let line = image.select(-1, 0, 5, 1).line(0);
        assert_eq!(
            line,
            vec![Color::TRANSPARENT, red(), blue(), Color::WHITE, Color::TRANSPARENT]
        );
        assert_eq!(image.store().downloads.get(), 1);
        assert_eq!(image.store().uploads.get(), 0);
    }
}
