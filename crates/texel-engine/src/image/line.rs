use std::ops::{Deref, DerefMut};

use crate::accel::AcceleratedStore;
use crate::coords::Rect;
use crate::error::Result;
use crate::paint::Color;

use super::Selection;

/// Writable copy of one selection row.
///
/// Holds `width` pixels initialized from the image. Edits are written back
/// on [`commit`](Self::commit), or on drop if never committed; pixels that
/// fall outside the image are discarded.
pub struct LineForWrite<'a, S: AcceleratedStore> {
    selection: Selection<'a, S>,
    row: i32,
    pixels: Vec<Color>,
    committed: bool,
}

impl<'a, S: AcceleratedStore> LineForWrite<'a, S> {
    pub(super) fn open(selection: Selection<'a, S>, row: i32) -> Self {
        let mut line = Self {
            selection,
            row,
            pixels: Vec::new(),
            committed: false,
        };
        if row < 0 || row >= selection.height() || selection.width() <= 0 {
            line.committed = true;
            return line;
        }

        line.pixels = vec![Color::TRANSPARENT; selection.width() as usize];
        if let Some((span, offset)) = line.span() {
            let len = span.width as usize;
            let read = selection
                .image()
                .store()
                .download(span, &mut line.pixels[offset..offset + len]);
            if let Err(e) = read {
                log::warn!("line read failed, starting from transparent: {e}");
            }
        }
        line
    }

    /// Local row index this line was opened for.
    pub fn row(&self) -> i32 {
        self.row
    }

    /// Absolute one-row rectangle covered by both the line and the image,
    /// with its offset into the line buffer.
    fn span(&self) -> Option<(Rect, usize)> {
        let sel = &self.selection;
        let line = Rect::new(sel.x(), sel.y().checked_add(self.row)?, self.pixels.len() as i32, 1);
        let span = line.intersect(sel.image().bounds())?;
        Some((span, (span.x - line.x) as usize))
    }

    fn write_back(&self) -> Result<()> {
        let Some((span, offset)) = self.span() else {
            return Ok(());
        };
        let len = span.width as usize;
        self.selection
            .image()
            .store()
            .upload(span, &self.pixels[offset..offset + len])
    }

    /// Takes the pixels without writing them back.
    pub(super) fn into_pixels(mut self) -> Vec<Color> {
        self.committed = true;
        std::mem::take(&mut self.pixels)
    }

    /// Writes the line back now and reports the outcome.
    pub fn commit(mut self) -> Result<()> {
        self.committed = true;
        self.write_back()
    }
}

impl<S: AcceleratedStore> Deref for LineForWrite<'_, S> {
    type Target = [Color];

    fn deref(&self) -> &[Color] {
        &self.pixels
    }
}

impl<S: AcceleratedStore> DerefMut for LineForWrite<'_, S> {
    fn deref_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }
}

impl<S: AcceleratedStore> Drop for LineForWrite<'_, S> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = self.write_back() {
            log::warn!("line write-back for row {} failed: {e}", self.row);
        }
    }
}
