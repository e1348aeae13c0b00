use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::device::pipeline::DrawParams;
use crate::device::store::encode_draw;
use crate::device::surface::{choose_alpha_mode, choose_surface_format};
use crate::device::{GpuContext, GpuInit, GpuStore, Program, ProgramDesc, SurfaceErrorAction};
use crate::error::{Error, Result};
use crate::executor::ExecutorHandle;
use crate::image::Image;
use crate::input::{SharedEventBuffer, SurfaceEvent};
use crate::paint::Color;

use super::{EVENT_CAPACITY, Screen, ScreenConfig};

/// Window-backed screen: GPU images presented to a wgpu surface.
///
/// The surface is created and configured on the owning thread from any
/// window that exposes raw window and display handles. Platform code feeds
/// window events through [`events`](Self::events).
pub struct SurfaceScreen {
    ctx: GpuContext,
    surface: Arc<wgpu::Surface<'static>>,
    config: wgpu::SurfaceConfiguration,
    view_format: wgpu::TextureFormat,
    present: Program,
    images: Vec<Image<GpuStore>>,
    current: usize,
    size: (u32, u32),
    events: SharedEventBuffer<SurfaceEvent>,
}

impl SurfaceScreen {
    /// Creates the device, the surface and the images.
    ///
    /// `config.width`/`config.height` should be the window's inner size in
    /// physical pixels.
    pub fn new<W>(
        executor: &ExecutorHandle,
        window: Arc<W>,
        init: GpuInit,
        config: ScreenConfig,
    ) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let (ctx, surface) = GpuContext::with_window(executor, init.clone(), window)?;
        let surface = Arc::new(surface);

        let (width, height) = (config.width, config.height);
        let target = Arc::clone(&surface);
        let surface_config = ctx.call(move |gpu| {
            let caps = target.get_capabilities(&gpu.adapter);
            let format = choose_surface_format(&caps, init.prefer_srgb)
                .ok_or_else(|| Error::gpu("no supported surface formats"))?;

            let surface_config = wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: width.max(1),
                height: height.max(1),
                present_mode: init.present_mode,
                alpha_mode: choose_alpha_mode(&caps, init.alpha_mode),
                // Image bytes are already encoded; render through a linear view.
                view_formats: vec![format.remove_srgb_suffix()],
                desired_maximum_frame_latency: init.desired_maximum_frame_latency,
            };
            target.configure(&gpu.device, &surface_config);
            Ok(surface_config)
        })?;

        let view_format = surface_config.format.remove_srgb_suffix();
        log::info!(
            "surface configured: {:?} via {view_format:?}, {width}x{height}",
            surface_config.format
        );

        let present = Program::compile(&ctx, ProgramDesc::blit_source(view_format))?;
        let images = make_images(&ctx, &config)?;

        Ok(Self {
            ctx,
            surface,
            config: surface_config,
            view_format,
            present,
            images,
            current: 0,
            size: (width, height),
            events: SharedEventBuffer::new(EVENT_CAPACITY)?,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Handle for feeding window events to this screen.
    pub fn events(&self) -> SharedEventBuffer<SurfaceEvent> {
        self.events.clone()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn is_double_buffered(&self) -> bool {
        self.images.len() == 2
    }
}

fn make_images(ctx: &GpuContext, config: &ScreenConfig) -> Result<Vec<Image<GpuStore>>> {
    let count = if config.double_buffered { 2 } else { 1 };
    (0..count)
        .map(|_| Image::new_gpu(ctx, config.width, config.height))
        .collect()
}

impl Screen for SurfaceScreen {
    type Store = GpuStore;

    fn current_image(&self) -> &Image<GpuStore> {
        &self.images[self.current]
    }

    fn draw(&mut self) -> Result<()> {
        let (width, height) = self.size;
        if width == 0 || height == 0 {
            // Minimized; nothing to present.
            return Ok(());
        }

        let surface = Arc::clone(&self.surface);
        let config = self.config.clone();
        let view_format = self.view_format;
        let program = self.present.clone();
        let image = self.current_image();
        let texture = Arc::clone(image.store().texture());
        let bounds = image.bounds();

        let failure = self.ctx.call(move |gpu| {
            let frame = match surface.get_current_texture() {
                Ok(frame) => frame,
                Err(err) => {
                    let action = SurfaceErrorAction::from_error(&err);
                    if action == SurfaceErrorAction::Reconfigure {
                        surface.configure(&gpu.device, &config);
                    }
                    return Ok(Some((action, err.to_string())));
                }
            };

            let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
                format: Some(view_format),
                ..Default::default()
            });
            let source = texture.create_view(&wgpu::TextureViewDescriptor::default());

            let mut encoder = gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("texel present encoder"),
                });

            // Clear pass: the surface may be larger than the image.
            {
                let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("texel present clear"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(Color::BLACK.to_wgpu()),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
            }

            let params = DrawParams::new(bounds, bounds, Color::TRANSPARENT, [0.0; 4]);
            encode_draw(
                &gpu.device,
                &mut encoder,
                &view,
                (config.width as i32, config.height as i32),
                &program,
                &params,
                &source,
            );

            gpu.queue.submit(std::iter::once(encoder.finish()));
            frame.present();
            Ok(None)
        })?;

        match failure {
            None => Ok(()),
            Some((SurfaceErrorAction::Fatal, reason)) => {
                log::error!("surface lost for good: {reason}");
                Err(Error::gpu(format!("surface error: {reason}")))
            }
            Some((action, reason)) => {
                log::warn!("surface error ({reason}); {action:?}");
                Ok(())
            }
        }
    }

    fn swap_images(&mut self) {
        self.current = (self.current + 1) % self.images.len();
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.size = (width, height);
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            let surface = Arc::clone(&self.surface);
            let config = self.config.clone();
            self.ctx.call(move |gpu| {
                surface.configure(&gpu.device, &config);
                Ok(())
            })?;
        }

        let config = ScreenConfig {
            width,
            height,
            double_buffered: self.is_double_buffered(),
        };
        let images = make_images(&self.ctx, &config)?;
        for old in std::mem::replace(&mut self.images, images) {
            old.release()?;
        }
        self.current = 0;
        log::debug!("surface screen resized to {width}x{height}");
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        self.events.drain()
    }
}

impl std::fmt::Debug for SurfaceScreen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceScreen")
            .field("format", &self.config.format)
            .field("size", &self.size)
            .field("double_buffered", &self.is_double_buffered())
            .finish_non_exhaustive()
    }
}

