use std::sync::Arc;

use anyhow::Context;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::Result;
use crate::executor::ExecutorHandle;

use super::GpuInit;
use super::pipeline::{self, IMAGE_FORMAT};
use super::program::{self, Program, ProgramDesc};

/// Built-in programs compiled once per device.
#[derive(Debug)]
pub(crate) struct Builtins {
    pub fill: Program,
    pub blit_source: Program,
    pub blit_over: Program,
}

/// wgpu objects owned by the executor's thread.
///
/// Only ever touched inside marshaled calls.
#[derive(Debug)]
pub(crate) struct GpuShared {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub builtins: Builtins,
    /// 1x1 transparent texture bound when a draw has no source.
    pub empty_source: wgpu::TextureView,
}

/// Handle to one logical GPU device plus the executor that owns it.
///
/// Cheap to clone. Every GPU operation made through a context (texture
/// creation, uploads, readbacks, command execution, program compilation) is
/// marshaled to the owning thread and blocks until it has run there.
#[derive(Debug, Clone)]
pub struct GpuContext {
    shared: Arc<GpuShared>,
    executor: ExecutorHandle,
}

impl GpuContext {
    /// Creates a headless device on the owning thread.
    pub fn new(executor: &ExecutorHandle, init: GpuInit) -> Result<Self> {
        let (ctx, _) = Self::bootstrap(executor, init, |_| Ok(None))?;
        Ok(ctx)
    }

    /// Creates a device compatible with a surface for `window`, creating the
    /// surface on the owning thread as well.
    pub(crate) fn with_window<W>(
        executor: &ExecutorHandle,
        init: GpuInit,
        window: Arc<W>,
    ) -> Result<(Self, wgpu::Surface<'static>)>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let (ctx, surface) = Self::bootstrap(executor, init, move |instance| {
            let surface = instance
                .create_surface(window)
                .context("failed to create wgpu surface")?;
            Ok(Some(surface))
        })?;
        let surface = surface.context("surface missing after creation")?;
        Ok((ctx, surface))
    }

    fn bootstrap<F>(
        executor: &ExecutorHandle,
        init: GpuInit,
        make_surface: F,
    ) -> Result<(Self, Option<wgpu::Surface<'static>>)>
    where
        F: FnOnce(&wgpu::Instance) -> Result<Option<wgpu::Surface<'static>>> + Send + 'static,
    {
        let (shared, surface) =
            executor.try_call(move || pollster::block_on(create_device(init, make_surface)))?;
        Ok((
            Self {
                shared: Arc::new(shared),
                executor: executor.clone(),
            },
            surface,
        ))
    }

    pub fn executor(&self) -> &ExecutorHandle {
        &self.executor
    }

    /// Adapter description (name, backend, device type).
    pub fn adapter_info(&self) -> Result<wgpu::AdapterInfo> {
        self.call(|gpu| Ok(gpu.adapter.get_info()))
    }

    /// Largest width or height accepted for an image.
    pub fn max_image_dimension(&self) -> Result<u32> {
        self.call(|gpu| Ok(gpu.device.limits().max_texture_dimension_2d))
    }

    /// Runs `f` against the device on the owning thread.
    pub(crate) fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&GpuShared) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.executor.try_call(move || f(&shared))
    }
}

async fn create_device<F>(
    init: GpuInit,
    make_surface: F,
) -> Result<(GpuShared, Option<wgpu::Surface<'static>>)>
where
    F: FnOnce(&wgpu::Instance) -> Result<Option<wgpu::Surface<'static>>>,
{
    let GpuInit {
        power_preference,
        force_fallback_adapter,
        backends,
        required_features,
        required_limits,
        ..
    } = init;

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    });

    let surface = make_surface(&instance)?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: surface.as_ref(),
            force_fallback_adapter,
        })
        .await
        .context("failed to find a suitable GPU adapter")?;

    let info = adapter.get_info();
    log::info!("using adapter {} ({:?}, {:?})", info.name, info.backend, info.device_type);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("texel device"),
            required_features,
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")?;

    let builtins = Builtins {
        fill: program::build(&device, &ProgramDesc::fill())?,
        blit_source: program::build(&device, &ProgramDesc::blit_source(IMAGE_FORMAT))?,
        blit_over: program::build(&device, &ProgramDesc::blit_over())?,
    };

    let empty_source = device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("texel empty source"),
            size: pipeline::extent(1, 1),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: IMAGE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default());

    Ok((
        GpuShared {
            adapter,
            device,
            queue,
            builtins,
            empty_source,
        },
        surface,
    ))
}
