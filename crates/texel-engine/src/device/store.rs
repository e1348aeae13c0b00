use std::sync::{Arc, mpsc};

use wgpu::util::DeviceExt;

use crate::accel::{AcceleratedImageSelection, AcceleratedStore, Command, copy_truncated};
use crate::coords::Rect;
use crate::error::{Error, Result};
use crate::paint::Color;

use super::context::{Builtins, GpuShared};
use super::pipeline::{
    DrawParams, IMAGE_FORMAT, colors_to_bytes, extent, padded_bytes_per_row, scissor_for,
    unpad_rows,
};
use super::{GpuContext, Program};

/// Texture-backed store. Pixels live on the GPU; every access is marshaled
/// to the owning thread.
#[derive(Debug)]
pub struct GpuStore {
    ctx: GpuContext,
    texture: Arc<wgpu::Texture>,
    width: i32,
    height: i32,
}

impl GpuStore {
    /// Allocates a transparent texture. Fails fast if either extent exceeds
    /// the device limit.
    pub fn new(ctx: &GpuContext, width: i32, height: i32) -> Result<Self> {
        let (width, height) = (width.max(0), height.max(0));
        let texture = ctx.call(move |gpu| {
            let max = gpu.device.limits().max_texture_dimension_2d;
            if width as u32 > max || height as u32 > max {
                return Err(Error::invalid_argument(format!(
                    "image {width}x{height} exceeds the device limit of {max}"
                )));
            }
            Ok(gpu.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("texel image"),
                size: extent(width, height),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: IMAGE_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            }))
        })?;

        Ok(Self {
            ctx: ctx.clone(),
            texture: Arc::new(texture),
            width,
            height,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    pub(crate) fn texture(&self) -> &Arc<wgpu::Texture> {
        &self.texture
    }

    fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }
}

impl AcceleratedStore for GpuStore {
    type Target<'a> = GpuTarget<'a>;
    type Source = GpuSource;

    fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn upload(&self, region: Rect, pixels: &[Color]) -> Result<()> {
        let mut staged = vec![Color::TRANSPARENT; region.area()];
        copy_truncated(pixels, &mut staged);

        let Some(visible) = region.intersect(self.bounds()) else {
            return Ok(());
        };

        let stride = region.width as usize;
        let (w, h) = (visible.width as usize, visible.height as usize);
        let mut bytes = Vec::with_capacity(w * h * 4);
        for y in visible.y..visible.bottom() {
            let start = (y - region.y) as usize * stride + (visible.x - region.x) as usize;
            bytes.extend(colors_to_bytes(&staged[start..start + w]));
        }

        let texture = Arc::clone(&self.texture);
        self.ctx.call(move |gpu| {
            gpu.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: visible.x as u32,
                        y: visible.y as u32,
                        z: 0,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                &bytes,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(visible.width as u32 * 4),
                    rows_per_image: Some(visible.height as u32),
                },
                extent(visible.width, visible.height),
            );
            Ok(())
        })
    }

    fn download(&self, region: Rect, pixels: &mut [Color]) -> Result<()> {
        let mut full = vec![Color::TRANSPARENT; region.area()];

        if let Some(visible) = region.intersect(self.bounds()) {
            let texture = Arc::clone(&self.texture);
            let read = self.ctx.call(move |gpu| readback(gpu, &texture, visible))?;

            let stride = region.width as usize;
            let w = visible.width as usize;
            for (j, row) in read.chunks(w).enumerate() {
                let y = (visible.y - region.y) as usize + j;
                let start = y * stride + (visible.x - region.x) as usize;
                full[start..start + w].copy_from_slice(row);
            }
        }

        copy_truncated(&full, pixels);
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
        let aux: Vec<(Arc<wgpu::Texture>, Rect, Rect)> = aux
            .iter()
            .map(|a| (Arc::clone(a.store.texture()), a.location, a.store.bounds()))
            .collect();
        let texture = Arc::clone(&self.texture);
        let bounds = self.bounds();

        self.ctx.call(move |gpu| {
            let mut encoder = gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("texel modify encoder"),
                });

            let sources: Vec<GpuSource> = aux
                .iter()
                .map(|(src, location, src_bounds)| {
                    GpuSource::stage(gpu, &mut encoder, src, *location, *src_bounds, bounds)
                })
                .collect();

            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let mut target = GpuTarget {
                gpu,
                encoder: &mut encoder,
                view: &view,
                region,
                bounds,
            };
            command.run(&mut target, &sources);

            gpu.queue.submit(std::iter::once(encoder.finish()));
            Ok(())
        })
    }

    fn release(self) -> Result<()> {
        let (w, h) = (self.width, self.height);
        let texture = self.texture;
        self.ctx.call(move |_| {
            texture.destroy();
            Ok(())
        })?;
        log::debug!("released {w}x{h} gpu store");
        Ok(())
    }
}

/// Copies `rect` (inside the texture) back to the CPU. Owning thread only.
fn readback(gpu: &GpuShared, texture: &wgpu::Texture, rect: Rect) -> Result<Vec<Color>> {
    let (width, height) = (rect.width as u32, rect.height as u32);
    let pitch = padded_bytes_per_row(width);

    let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("texel readback"),
        size: pitch as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("texel readback encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: rect.x as u32,
                y: rect.y as u32,
                z: 0,
            },
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(pitch),
                rows_per_image: Some(height),
            },
        },
        extent(rect.width, rect.height),
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    gpu.device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| Error::gpu(format!("device poll failed: {e}")))?;

    rx.recv()
        .map_err(|_| Error::gpu("readback callback was dropped"))?
        .map_err(|e| Error::gpu(format!("readback mapping failed: {e}")))?;

    let pixels = {
        let mapped = slice.get_mapped_range();
        unpad_rows(&mapped, width, height)
    };
    buffer.unmap();
    Ok(pixels)
}

/// Drawing handle for [`GpuStore`]: an encoder recording into the target
/// texture, valid for one `modify` call.
pub struct GpuTarget<'a> {
    gpu: &'a GpuShared,
    encoder: &'a mut wgpu::CommandEncoder,
    view: &'a wgpu::TextureView,
    region: Rect,
    bounds: Rect,
}

impl GpuTarget<'_> {
    /// Effective region of the `modify` call.
    pub fn region(&self) -> Rect {
        self.region
    }

    /// Full extent of the target image.
    pub fn image_bounds(&self) -> Rect {
        self.bounds
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.gpu.device
    }

    pub fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        &mut *self.encoder
    }

    pub(crate) fn builtins(&self) -> &Builtins {
        &self.gpu.builtins
    }

    /// Runs `program` over `rect` (clipped to the image), sampling `source`
    /// if given.
    pub fn draw(
        &mut self,
        program: &Program,
        rect: Rect,
        source: Option<&GpuSource>,
        color: Color,
        extra: [f32; 4],
    ) {
        if program.format() != IMAGE_FORMAT {
            log::warn!(
                "program `{}` targets {:?}, not an image format; skipped",
                program.label(),
                program.format()
            );
            return;
        }
        let (view, texture_rect) = match source {
            Some(s) => (&s.view, s.texture_rect),
            None => (&self.gpu.empty_source, Rect::default()),
        };
        let params = DrawParams::new(rect, texture_rect, color, extra);
        encode_draw(
            &self.gpu.device,
            &mut *self.encoder,
            self.view,
            (self.bounds.width, self.bounds.height),
            program,
            &params,
            view,
        );
    }
}

/// Records one scissored fullscreen-triangle pass. Owning thread only.
pub(crate) fn encode_draw(
    device: &wgpu::Device,
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    (width, height): (i32, i32),
    program: &Program,
    params: &DrawParams,
    source: &wgpu::TextureView,
) {
    let [x, y, w, h] = params.region;
    let Some((sx, sy, sw, sh)) = scissor_for(Rect::new(x, y, w, h), width, height) else {
        return;
    };

    let ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("texel draw params"),
        contents: bytemuck::bytes_of(params),
        usage: wgpu::BufferUsages::UNIFORM,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("texel draw bind group"),
        layout: program.bind_group_layout(),
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(source),
            },
        ],
    });

    let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(program.label()),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });

    rpass.set_pipeline(program.pipeline());
    rpass.set_bind_group(0, &bind_group, &[]);
    rpass.set_scissor_rect(sx, sy, sw, sh);
    rpass.draw(0..3, 0..1);
}

/// Auxiliary region staged into its own texture before the command runs.
///
/// Staging makes a region of the target image safe to sample while the
/// target is being rendered to.
pub struct GpuSource {
    location: Rect,
    texture_rect: Rect,
    view: wgpu::TextureView,
}

impl GpuSource {
    fn stage(
        gpu: &GpuShared,
        encoder: &mut wgpu::CommandEncoder,
        src: &wgpu::Texture,
        location: Rect,
        src_bounds: Rect,
        target_bounds: Rect,
    ) -> Self {
        // Nothing past the target image's extent can ever be read.
        let w = location.width.min(target_bounds.width).max(0);
        let h = location.height.min(target_bounds.height).max(0);
        let texture_rect = Rect::from_size(w, h);

        let staging = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("texel source stage"),
            size: extent(w, h),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: IMAGE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let wanted = Rect::new(location.x, location.y, w, h);
        if let Some(v) = wanted.intersect(src_bounds) {
            encoder.copy_texture_to_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: src,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: v.x as u32,
                        y: v.y as u32,
                        z: 0,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyTextureInfo {
                    texture: &staging,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: (v.x - location.x) as u32,
                        y: (v.y - location.y) as u32,
                        z: 0,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                extent(v.width, v.height),
            );
        }

        Self {
            location,
            texture_rect,
            view: staging.create_view(&wgpu::TextureViewDescriptor::default()),
        }
    }

    /// Absolute location the region was sampled from.
    pub fn location(&self) -> Rect {
        self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::{Blend, Clear};
    use crate::device::context::tests::with_gpu;
    use crate::image::Image;

    fn red() -> Color {
        Color::opaque(255, 0, 0)
    }

    #[test_log::test]
    fn gpu_pixel_round_trip() {
        with_gpu(|ctx| {
            let image = Image::new_gpu(&ctx, 3, 2).unwrap();
            let sel = image.selection();
            sel.set_color(2, 1, red());
            assert_eq!(sel.color(2, 1), red());
            assert_eq!(sel.color(0, 0), Color::TRANSPARENT);
            assert_eq!(sel.color(5, 5), Color::TRANSPARENT);
        });
    }

    #[test_log::test]
    fn gpu_clear_and_blend_match_cpu() {
        with_gpu(|ctx| {
            let target = Image::new_gpu(&ctx, 4, 4).unwrap();
            let source = Image::new_gpu(&ctx, 2, 2).unwrap();
            source.selection().modify(Clear(red()), &[]).unwrap();
            target.selection().modify(Clear(Color::BLACK), &[]).unwrap();

            target
                .select(3, 3, 1, 1)
                .modify(Blend::source(), &[source.selection()])
                .unwrap();

            let out = target.selection().pixels().unwrap();
            assert_eq!(out[15], red());
            assert_eq!(out[14], Color::BLACK);
            assert_eq!(out.iter().filter(|c| **c == red()).count(), 1);
        });
    }

    #[test_log::test]
    fn gpu_blend_within_one_image() {
        with_gpu(|ctx| {
            let image = Image::new_gpu(&ctx, 2, 1).unwrap();
            image.select(0, 0, 1, 1).modify(Clear(red()), &[]).unwrap();
            let left = image.select(0, 0, 1, 1);
            image.select(1, 0, 1, 1).modify(Blend::source(), &[left]).unwrap();
            assert_eq!(image.selection().pixels().unwrap(), vec![red(), red()]);
        });
    }

    #[test_log::test]
    fn gpu_upload_download_truncates_and_zero_fills() {
        with_gpu(|ctx| {
            let image = Image::new_gpu(&ctx, 2, 2).unwrap();
            image.selection().upload(&[red(), Color::WHITE, Color::BLACK]).unwrap();

            let mut out = [Color::WHITE; 5];
            image.selection().download(&mut out).unwrap();
            assert_eq!(
                out,
                [
                    red(),
                    Color::WHITE,
                    Color::BLACK,
                    Color::TRANSPARENT,
                    Color::TRANSPARENT
                ]
            );
        });
    }

    #[test_log::test]
    fn oversized_gpu_image_fails_fast() {
        with_gpu(|ctx| {
            let err = Image::new_gpu(&ctx, 1 << 30, 1).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        });
    }

    #[test_log::test]
    fn gpu_release_destroys_texture() {
        with_gpu(|ctx| {
            let image = Image::new_gpu(&ctx, 2, 2).unwrap();
            image.release().unwrap();
        });
    }
}
