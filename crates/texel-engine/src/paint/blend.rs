use super::Color;

/// Compositing rule used when one region is blended onto another.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Copy source pixels, alpha included, over the destination.
    Source,
    /// `out = src + dst * (1 - src.a)` per channel in normalized space. A
    /// fully transparent source leaves the destination untouched.
    #[default]
    SourceOver,
}

impl BlendMode {
    /// Combines one source pixel with one destination pixel.
    pub fn apply(self, src: Color, dst: Color) -> Color {
        match self {
            BlendMode::Source => src,
            BlendMode::SourceOver => source_over(src, dst),
        }
    }

    /// Fixed-function blend state matching [`apply`](Self::apply).
    ///
    /// Shaders feeding a `SourceOver` pipeline emit the source unchanged and
    /// discard fully transparent texels.
    pub fn blend_state(self) -> wgpu::BlendState {
        match self {
            BlendMode::Source => wgpu::BlendState::REPLACE,
            BlendMode::SourceOver => premul_alpha_blend(),
        }
    }
}

fn source_over(src: Color, dst: Color) -> Color {
    if src.a == 0 {
        return dst;
    }
    if src.a == 255 {
        return src;
    }

    let [sr, sg, sb, sa] = src.to_f32();
    let [dr, dg, db, da] = dst.to_f32();
    let inv = 1.0 - sa;

    Color::from_f32([
        sr + dr * inv,
        sg + dg * inv,
        sb + db * inv,
        sa + da * inv,
    ])
}

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_replaces_including_alpha() {
        let src = Color::new(10, 20, 30, 0);
        assert_eq!(BlendMode::Source.apply(src, Color::WHITE), src);
    }

    #[test]
    fn source_over_transparent_keeps_destination() {
        let dst = Color::new(12, 34, 56, 78);
        assert_eq!(BlendMode::SourceOver.apply(Color::new(200, 100, 50, 0), dst), dst);
    }

    #[test]
    fn source_over_opaque_replaces() {
        let src = Color::opaque(1, 2, 3);
        assert_eq!(BlendMode::SourceOver.apply(src, Color::WHITE), src);
    }

    #[test]
    fn source_over_half_alpha_on_black() {
        let out = BlendMode::SourceOver.apply(Color::new(255, 255, 255, 128), Color::BLACK);
        assert_eq!(out, Color::new(255, 255, 255, 255));
    }

    #[test]
    fn source_over_onto_transparent() {
        let out = BlendMode::SourceOver.apply(Color::new(255, 0, 0, 128), Color::TRANSPARENT);
        assert_eq!(out, Color::new(255, 0, 0, 128));
    }

    #[test]
    fn source_over_adds_scaled_destination() {
        // 0.2 + 0.6 * (1 - 0.5) = 0.5 on the red channel.
        let src = Color::new(51, 0, 0, 128);
        let dst = Color::new(153, 0, 0, 255);
        let out = BlendMode::SourceOver.apply(src, dst);
        assert!((out.r as i32 - 127).abs() <= 1, "got {out:?}");
        assert_eq!(out.a, 255);
    }
}
