//! Shared GPU types and byte-layout helpers used by the store and programs.

use bytemuck::{Pod, Zeroable};

use crate::coords::Rect;
use crate::paint::Color;

/// Texture format of every GPU-backed image: straight-alpha RGBA, 8 bits per
/// channel, no sRGB conversion (bytes round-trip unchanged).
pub const IMAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ── draw parameters ───────────────────────────────────────────────────────

/// Uniform block bound at `@group(0) @binding(0)` for every program.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct DrawParams {
    /// Target rectangle, absolute pixels.
    pub region: [i32; 4],
    /// Source rectangle inside the bound source texture.
    pub source: [i32; 4],
    /// Straight-alpha color (fill color, or a program parameter).
    pub color: [f32; 4],
    /// Free-form program parameters.
    pub extra: [f32; 4],
}

impl DrawParams {
    pub fn new(region: Rect, source: Rect, color: Color, extra: [f32; 4]) -> Self {
        Self {
            region: rect_to_array(region),
            source: rect_to_array(source),
            color: color.to_f32(),
            extra,
        }
    }
}

fn rect_to_array(r: Rect) -> [i32; 4] {
    [r.x, r.y, r.width, r.height]
}

pub(crate) fn params_min_binding_size() -> Option<std::num::NonZeroU64> {
    std::num::NonZeroU64::new(std::mem::size_of::<DrawParams>() as u64)
}

// ── scissor rect ──────────────────────────────────────────────────────────

/// Scissor arguments for `rect` on a `width` x `height` attachment.
///
/// Returns `None` for a zero-area result (the draw is skipped).
pub(crate) fn scissor_for(rect: Rect, width: i32, height: i32) -> Option<(u32, u32, u32, u32)> {
    let r = rect.intersect(Rect::from_size(width, height))?;
    Some((r.x as u32, r.y as u32, r.width as u32, r.height as u32))
}

// ── texel copies ──────────────────────────────────────────────────────────

pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// Row pitch of a readback buffer for `width` pixels.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    align_to(width * 4, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Drops row padding from a mapped readback buffer.
pub(crate) fn unpad_rows(padded: &[u8], width: u32, height: u32) -> Vec<Color> {
    let pitch = padded_bytes_per_row(width) as usize;
    let row_bytes = width as usize * 4;
    let mut out = Vec::with_capacity(width as usize * height as usize);
    for row in padded.chunks(pitch).take(height as usize) {
        out.extend(
            row[..row_bytes.min(row.len())]
                .chunks_exact(4)
                .map(|px| Color::new(px[0], px[1], px[2], px[3])),
        );
    }
    out
}

pub(crate) fn colors_to_bytes(pixels: &[Color]) -> Vec<u8> {
    pixels.iter().flat_map(|c| c.to_bytes()).collect()
}

pub(crate) fn extent(width: i32, height: i32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: width.max(1) as u32,
        height: height.max(1) as u32,
        depth_or_array_layers: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_layout_is_uniform_friendly() {
        assert_eq!(std::mem::size_of::<DrawParams>(), 64);
        assert!(params_min_binding_size().is_some());
    }

    #[test]
    fn scissor_is_clipped_to_attachment() {
        assert_eq!(scissor_for(Rect::new(-2, 3, 5, 10), 4, 6), Some((0, 3, 3, 3)));
        assert_eq!(scissor_for(Rect::new(4, 0, 2, 2), 4, 4), None);
    }

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn unpad_keeps_only_pixel_bytes() {
        let mut padded = vec![0u8; 512];
        padded[..4].copy_from_slice(&[1, 2, 3, 4]);
        padded[256..260].copy_from_slice(&[5, 6, 7, 8]);
        assert_eq!(
            unpad_rows(&padded, 1, 2),
            vec![Color::new(1, 2, 3, 4), Color::new(5, 6, 7, 8)]
        );
    }

    #[test]
    fn draw_params_carry_straight_color() {
        let p = DrawParams::new(
            Rect::new(1, 2, 3, 4),
            Rect::from_size(3, 4),
            Color::WHITE,
            [0.0; 4],
        );
        assert_eq!(p.region, [1, 2, 3, 4]);
        assert_eq!(p.color, [1.0, 1.0, 1.0, 1.0]);
    }
}
