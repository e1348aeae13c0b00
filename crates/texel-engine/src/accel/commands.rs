//! Intrinsic commands.
//!
//! `Clear` and `Blend` run on every backend; the GPU implementations live
//! next to the GPU store. `ShadePixels` is the CPU counterpart of a custom
//! draw program.

use crate::coords::Rect;
use crate::paint::{BlendMode, Color};

use super::{Command, CpuSource, CpuStore, CpuTarget};

/// Fills the targeted region with one color (no compositing).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Clear(pub Color);

/// Composites the first auxiliary region onto the target.
///
/// The copied rectangle starts at the target region's origin and is clamped
/// by [`blend_rect`]; without an auxiliary region the command does nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Blend(pub BlendMode);

impl Blend {
    pub const fn source() -> Self {
        Self(BlendMode::Source)
    }

    pub const fn source_over() -> Self {
        Self(BlendMode::SourceOver)
    }
}

/// Per-pixel CPU shading over the targeted region.
///
/// The closure receives region-local coordinates and the current color and
/// returns the replacement.
pub struct ShadePixels<F>(pub F);

/// Rectangle actually written when blending `source` onto `target`.
///
/// Each axis keeps `min(source_extent, image_extent - target_offset)`, so the
/// copy may extend past the target region but never past the image.
pub fn blend_rect(target: Rect, source: Rect, image: Rect) -> Rect {
    Rect::new(
        target.x,
        target.y,
        source.width.min(image.right() - target.x),
        source.height.min(image.bottom() - target.y),
    )
}

impl Command<CpuStore> for Clear {
    fn run(&self, target: &mut CpuTarget<'_>, _sources: &[CpuSource]) {
        let color = self.0;
        let region = target.region();
        target.map_rect(region, |_, _, _| color);
    }
}

impl Command<CpuStore> for Blend {
    fn run(&self, target: &mut CpuTarget<'_>, sources: &[CpuSource]) {
        let Some(source) = sources.first() else {
            log::debug!("blend without a source region; nothing to do");
            return;
        };

        let mode = self.0;
        let rect = blend_rect(target.region(), source.location(), target.image_bounds());
        target.map_rect(rect, |x, y, dst| {
            mode.apply(source.pixel(x - rect.x, y - rect.y), dst)
        });
    }
}

impl<F> Command<CpuStore> for ShadePixels<F>
where
    F: Fn(i32, i32, Color) -> Color + Send + 'static,
{
    fn run(&self, target: &mut CpuTarget<'_>, _sources: &[CpuSource]) {
        let region = target.region();
        target.map_rect(region, |x, y, c| (self.0)(x - region.x, y - region.y, c));
    }
}
