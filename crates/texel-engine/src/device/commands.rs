//! GPU implementations of the intrinsic commands, plus [`Draw`].

use crate::accel::{Blend, Clear, Command, blend_rect};
use crate::paint::{BlendMode, Color};

use super::Program;
use super::store::{GpuSource, GpuStore, GpuTarget};

impl Command<GpuStore> for Clear {
    fn run(&self, target: &mut GpuTarget<'_>, _sources: &[GpuSource]) {
        let fill = target.builtins().fill.clone();
        let region = target.region();
        target.draw(&fill, region, None, self.0, [0.0; 4]);
    }
}

impl Command<GpuStore> for Blend {
    fn run(&self, target: &mut GpuTarget<'_>, sources: &[GpuSource]) {
        let Some(source) = sources.first() else {
            log::debug!("blend without a source region; nothing to do");
            return;
        };

        let builtins = target.builtins();
        let program = match self.0 {
            BlendMode::Source => builtins.blit_source.clone(),
            BlendMode::SourceOver => builtins.blit_over.clone(),
        };
        let rect = blend_rect(target.region(), source.location(), target.image_bounds());
        target.draw(&program, rect, Some(source), Color::TRANSPARENT, [0.0; 4]);
    }
}

/// Runs a custom [`Program`] over the targeted region.
///
/// The first auxiliary region, if any, is what `source_texel` samples. `color`
/// and `extra` reach the shader as `params.color` and `params.extra`.
#[derive(Debug, Clone)]
pub struct Draw {
    pub program: Program,
    pub color: Color,
    pub extra: [f32; 4],
}

impl Draw {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            color: Color::TRANSPARENT,
            extra: [0.0; 4],
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_extra(mut self, extra: [f32; 4]) -> Self {
        self.extra = extra;
        self
    }
}

impl Command<GpuStore> for Draw {
    fn run(&self, target: &mut GpuTarget<'_>, sources: &[GpuSource]) {
        let region = target.region();
        target.draw(&self.program, region, sources.first(), self.color, self.extra);
    }
}
