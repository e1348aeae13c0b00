//! Compiled draw programs.
//!
//! A program is a WGSL fragment stage appended to a shared prelude that
//! provides the vertex stage, the `params` uniform and `source_texel`.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::paint::BlendMode;

use super::GpuContext;
use super::pipeline::{IMAGE_FORMAT, params_min_binding_size};

const PRELUDE: &str = include_str!("shaders/prelude.wgsl");
const FILL: &str = include_str!("shaders/fill.wgsl");
const BLIT: &str = include_str!("shaders/blit.wgsl");

/// Everything needed to build a [`Program`].
#[derive(Debug, Clone)]
pub struct ProgramDesc {
    pub label: String,
    /// WGSL fragment source. May use `params`, `source_texel` and `local_pos`.
    pub source: String,
    pub entry_point: String,
    /// How the fragment output combines with the target.
    pub blend: BlendMode,
    /// Color target format; images use [`IMAGE_FORMAT`].
    pub format: wgpu::TextureFormat,
}

impl ProgramDesc {
    /// Fragment entry point `fs_main`, source-over blending, image format.
    pub fn new(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            entry_point: "fs_main".to_owned(),
            blend: BlendMode::SourceOver,
            format: IMAGE_FORMAT,
        }
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub(crate) fn fill() -> Self {
        Self::new("texel fill", FILL).with_blend(BlendMode::Source)
    }

    pub(crate) fn blit_source(format: wgpu::TextureFormat) -> Self {
        Self::new("texel blit source", BLIT)
            .with_entry_point("fs_source")
            .with_blend(BlendMode::Source)
            .with_format(format)
    }

    pub(crate) fn blit_over() -> Self {
        Self::new("texel blit over", BLIT).with_entry_point("fs_over")
    }
}

/// A render pipeline ready to run over image regions.
///
/// Cheap to clone; usable from any thread (it only runs on the owning one).
#[derive(Clone)]
pub struct Program {
    inner: Arc<ProgramInner>,
}

struct ProgramInner {
    label: String,
    format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl Program {
    /// Compiles `desc` on the owning thread.
    ///
    /// A rejected shader or pipeline yields [`Error::Compile`] with the
    /// backend's message; the executor keeps running.
    pub fn compile(ctx: &GpuContext, desc: ProgramDesc) -> Result<Self> {
        ctx.call(move |gpu| build(&gpu.device, &desc))
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.inner.format
    }

    pub(crate) fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.inner.pipeline
    }

    pub(crate) fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.inner.bind_group_layout
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("label", &self.inner.label)
            .field("format", &self.inner.format)
            .finish_non_exhaustive()
    }
}

/// Builds a program on the current thread. Must run on the owning thread.
pub(crate) fn build(device: &wgpu::Device, desc: &ProgramDesc) -> Result<Program> {
    let label = desc.label.as_str();
    let source = format!("{PRELUDE}\n{}", desc.source);

    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: params_min_binding_size(),
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[&bind_group_layout],
        immediate_size: 0,
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),

        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },

        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(desc.entry_point.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.format,
                blend: Some(desc.blend.blend_state()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    if let Some(err) = pollster::block_on(scope.pop()) {
        log::warn!("program `{label}` rejected: {err}");
        return Err(Error::compile(label, err.to_string()));
    }

    log::debug!("compiled program `{label}` for {:?}", desc.format);
    Ok(Program {
        inner: Arc::new(ProgramInner {
            label: desc.label.clone(),
            format: desc.format,
            pipeline,
            bind_group_layout,
        }),
    })
}
