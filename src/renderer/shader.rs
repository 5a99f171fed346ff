//! Shader programs and deferred draw intents.
//!
//! A [`ShaderProgram`] owns one compiled WGSL module (entry points
//! `vs_main`/`fs_main`, the project-wide convention). Its
//! [`invoke`](ShaderProgram::invoke) operation binds a vertex buffer, an
//! ordered list of uniform values, and an ordered list of texture
//! attachments, and returns a [`DrawIntent`] instead of drawing. The intent
//! carries all prepared bind state as a value, so a render target can
//! execute it later without any hidden "currently bound" object between the
//! two calls.
//!
//! ## Binding plan
//!
//! All resources of one invocation live in bind group 0. Uniforms occupy
//! bindings `[attribute_count, attribute_count + U)` in list order, textures
//! the bindings immediately after, and the shared sampler the binding after
//! the last texture. Shader authors index bindings the same way they index
//! vertex locations: attributes first, then the invocation arguments in
//! order.
//!
//! ## Pipeline cache
//!
//! wgpu pipelines are immutable and bound to their target formats, so the
//! program keeps a cache keyed by target formats plus the invocation's
//! vertex layout and binding signature. Cache misses create the pipeline on
//! first execute against a given target shape; creation failures (missing
//! entry point, binding mismatch) are trapped with a validation error scope
//! and are fatal, the same as a compile failure.

use std::cell::RefCell;
use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::renderer::context::Gpu;
use crate::renderer::loader::ShaderLoader;
use crate::renderer::target::TextureAttachment;
use crate::renderer::uniform::UniformValue;
use crate::renderer::vertex::VertexBuffer;

/// Texture sampling configuration shared by all textures of an invocation.
///
/// Defaults mirror GL's classic read mode: linear min/mag filtering with
/// repeat wrapping. Depth-format textures reject filtering samplers, so an
/// invocation that binds one is sampled nearest regardless of this setting.
#[derive(Copy, Clone, Debug)]
pub struct SamplerConfig {
    /// Minification filter.
    pub min_filter: wgpu::FilterMode,
    /// Magnification filter.
    pub mag_filter: wgpu::FilterMode,
    /// Wrap mode along U.
    pub wrap_u: wgpu::AddressMode,
    /// Wrap mode along V.
    pub wrap_v: wgpu::AddressMode,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            min_filter: wgpu::FilterMode::Linear,
            mag_filter: wgpu::FilterMode::Linear,
            wrap_u: wgpu::AddressMode::Repeat,
            wrap_v: wgpu::AddressMode::Repeat,
        }
    }
}

/// Assigns bind group indices for one invocation.
///
/// Uniform bindings start where vertex attribute locations end, textures
/// follow the uniforms, and the shared sampler follows the textures.
#[derive(Copy, Clone, Debug)]
pub(crate) struct BindingPlan {
    attribute_count: u32,
    uniform_count: u32,
    texture_count: u32,
}

impl BindingPlan {
    pub(crate) fn new(attribute_count: u32, uniform_count: u32, texture_count: u32) -> Self {
        Self {
            attribute_count,
            uniform_count,
            texture_count,
        }
    }

    pub(crate) fn uniform_binding(&self, index: u32) -> u32 {
        debug_assert!(index < self.uniform_count);
        self.attribute_count + index
    }

    pub(crate) fn texture_binding(&self, index: u32) -> u32 {
        debug_assert!(index < self.texture_count);
        self.attribute_count + self.uniform_count + index
    }

    pub(crate) fn sampler_binding(&self) -> u32 {
        self.attribute_count + self.uniform_count + self.texture_count
    }
}

/// Identity of a pipeline within a program's cache.
#[derive(Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    primitive: wgpu::PrimitiveTopology,
    stride: wgpu::BufferAddress,
    vertex_formats: Vec<wgpu::VertexFormat>,
    uniform_count: u32,
    depth_textures: Vec<bool>,
    filtering: bool,
    color_formats: Vec<wgpu::TextureFormat>,
    depth_stencil_format: Option<wgpu::TextureFormat>,
}

/// A compiled shader program with a per-target pipeline cache.
///
/// Construction obtains the WGSL source from the [`ShaderLoader`], compiles
/// it, and exits the process with the compiler diagnostic if validation
/// fails. Invoked many times per frame; destroyed at teardown with its
/// owner.
pub struct ShaderProgram {
    name: String,
    device: wgpu::Device,
    module: wgpu::ShaderModule,
    /// Sampling configuration applied to every texture bound by an
    /// invocation of this program.
    pub sampler_config: SamplerConfig,
    // Single-threaded render loop; interior mutability keeps `invoke` and
    // `execute` free of `&mut` plumbing through the draw intent.
    pipelines: RefCell<HashMap<PipelineKey, wgpu::RenderPipeline>>,
}

impl ShaderProgram {
    /// Loads and compiles the WGSL module named `name`.
    ///
    /// Fatal if the source cannot be found or fails validation; the
    /// diagnostic names the shader and quotes the compiler message.
    pub fn new(gpu: &Gpu, loader: &ShaderLoader, name: &str) -> Self {
        let source = loader.load(name);

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(name),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        if let Some(err) = pollster::block_on(gpu.device.pop_error_scope()) {
            log::error!("in {name}.wgsl: {err}");
            std::process::exit(1);
        }

        Self {
            name: name.to_string(),
            device: gpu.device.clone(),
            module,
            sampler_config: SamplerConfig::default(),
            pipelines: RefCell::new(HashMap::new()),
        }
    }

    /// Prepares a deferred draw of `buffer` with the given arguments.
    ///
    /// Uniforms are uploaded to consecutive bindings starting at the
    /// buffer's attribute count, textures to the bindings after them (units
    /// in list order), and the shared sampler to the binding after the last
    /// texture. Returns the draw intent - the draw itself is issued by
    /// whichever [`RenderTarget`](crate::renderer::target::RenderTarget)
    /// consumes the intent.
    ///
    /// Fatal if a texture argument is a renderbuffer attachment (those have
    /// no sampleable storage).
    pub fn invoke<'a>(
        &'a self,
        buffer: &'a VertexBuffer,
        uniforms: &[&UniformValue],
        textures: &[&TextureAttachment],
    ) -> DrawIntent<'a> {
        let plan = BindingPlan::new(
            buffer.attribute_count(),
            uniforms.len() as u32,
            textures.len() as u32,
        );

        for texture in textures {
            if !texture.is_sampleable() {
                log::error!(
                    "shader '{}' invoked with a renderbuffer attachment as a texture input",
                    self.name
                );
                std::process::exit(1);
            }
        }
        let any_depth = textures.iter().any(|t| t.is_depth());

        let mut layout_entries = Vec::new();
        for (index, _) in uniforms.iter().enumerate() {
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: plan.uniform_binding(index as u32),
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        for (index, texture) in textures.iter().enumerate() {
            let sample_type = if texture.is_depth() {
                wgpu::TextureSampleType::Depth
            } else {
                wgpu::TextureSampleType::Float { filterable: true }
            };
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: plan.texture_binding(index as u32),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type,
                },
                count: None,
            });
        }
        if !textures.is_empty() {
            let binding_type = if any_depth {
                wgpu::SamplerBindingType::NonFiltering
            } else {
                wgpu::SamplerBindingType::Filtering
            };
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: plan.sampler_binding(),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(binding_type),
                count: None,
            });
        }

        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{} bind group layout", self.name)),
                    entries: &layout_entries,
                });

        // One small uniform buffer per argument; the bind group keeps them
        // alive for as long as the intent can be executed.
        let uniform_buffers: Vec<wgpu::Buffer> = uniforms
            .iter()
            .map(|value| {
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{} uniform", self.name)),
                        contents: &value.as_uniform_bytes(),
                        usage: wgpu::BufferUsages::UNIFORM,
                    })
            })
            .collect();

        let sampler = (!textures.is_empty()).then(|| {
            let config = self.sampler_config;
            let (min_filter, mag_filter) = if any_depth {
                (wgpu::FilterMode::Nearest, wgpu::FilterMode::Nearest)
            } else {
                (config.min_filter, config.mag_filter)
            };
            self.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(&format!("{} sampler", self.name)),
                address_mode_u: config.wrap_u,
                address_mode_v: config.wrap_v,
                min_filter,
                mag_filter,
                ..Default::default()
            })
        });

        let mut entries = Vec::new();
        for (index, buffer) in uniform_buffers.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: plan.uniform_binding(index as u32),
                resource: buffer.as_entire_binding(),
            });
        }
        for (index, texture) in textures.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: plan.texture_binding(index as u32),
                resource: wgpu::BindingResource::TextureView(texture.view()),
            });
        }
        if let Some(sampler) = &sampler {
            entries.push(wgpu::BindGroupEntry {
                binding: plan.sampler_binding(),
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} bind group", self.name)),
            layout: &bind_group_layout,
            entries: &entries,
        });

        DrawIntent {
            primitive: wgpu::PrimitiveTopology::TriangleList,
            vertex_count: buffer.vertex_count(),
            program: self,
            buffer,
            bind_group_layout,
            bind_group,
            uniform_count: uniforms.len() as u32,
            depth_textures: textures.iter().map(|t| t.is_depth()).collect(),
            filtering: !any_depth,
        }
    }

    /// Fetches or creates the pipeline for an intent against a target shape.
    fn pipeline_for(
        &self,
        intent: &DrawIntent<'_>,
        color_formats: &[wgpu::TextureFormat],
        depth_stencil_format: Option<wgpu::TextureFormat>,
    ) -> wgpu::RenderPipeline {
        let layout = intent.buffer.layout();
        let key = PipelineKey {
            primitive: intent.primitive,
            stride: layout.stride,
            vertex_formats: layout.attributes.iter().map(|a| a.format).collect(),
            uniform_count: intent.uniform_count,
            depth_textures: intent.depth_textures.clone(),
            filtering: intent.filtering,
            color_formats: color_formats.to_vec(),
            depth_stencil_format,
        };

        if let Some(pipeline) = self.pipelines.borrow().get(&key) {
            return pipeline.clone();
        }

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&self.name),
                bind_group_layouts: &[&intent.bind_group_layout],
                push_constant_ranges: &[],
            });

        let targets: Vec<Option<wgpu::ColorTargetState>> = color_formats
            .iter()
            .map(|format| {
                Some(wgpu::ColorTargetState {
                    format: *format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&self.name),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.module,
                    entry_point: Some("vs_main"),
                    buffers: &[layout.buffer_layout()],
                    compilation_options: Default::default(),
                },
                fragment: (!color_formats.is_empty()).then(|| wgpu::FragmentState {
                    module: &self.module,
                    entry_point: Some("fs_main"),
                    targets: &targets,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: intent.primitive,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: depth_stencil_format.map(|format| wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: format.has_depth_aspect(),
                    depth_compare: if format.has_depth_aspect() {
                        wgpu::CompareFunction::Less
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            log::error!("failed to link shader '{}' against target: {err}", self.name);
            std::process::exit(1);
        }

        self.pipelines.borrow_mut().insert(key, pipeline.clone());
        pipeline
    }
}

/// The deferred description of a draw call.
///
/// Produced by [`ShaderProgram::invoke`] and consumed exactly once by
/// [`RenderTarget::execute`](crate::renderer::target::RenderTarget::execute).
/// Borrows the program and vertex buffer; everything else it needs (bind
/// group, layout) is owned, so no bind to a different object between invoke
/// and execute can invalidate it.
pub struct DrawIntent<'a> {
    /// Primitive kind drawn by execute. Defaults to a triangle list.
    pub primitive: wgpu::PrimitiveTopology,
    /// Number of vertices drawn, starting at index 0.
    pub vertex_count: u32,
    program: &'a ShaderProgram,
    buffer: &'a VertexBuffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    uniform_count: u32,
    depth_textures: Vec<bool>,
    filtering: bool,
}

impl DrawIntent<'_> {
    /// Overrides the primitive kind.
    pub fn with_primitive(mut self, primitive: wgpu::PrimitiveTopology) -> Self {
        self.primitive = primitive;
        self
    }

    /// Encodes this intent's draw into an open render pass.
    pub(crate) fn encode(
        self,
        pass: &mut wgpu::RenderPass<'_>,
        color_formats: &[wgpu::TextureFormat],
        depth_stencil_format: Option<wgpu::TextureFormat>,
    ) {
        let pipeline = self
            .program
            .pipeline_for(&self, color_formats, depth_stencil_format);
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.buffer.slice());
        pass.draw(0..self.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Uniforms bind to `[attribute_count, attribute_count + U)` and texture
    /// samplers to the locations immediately after, units in list order.
    #[test]
    fn bindings_follow_attributes_then_uniforms_then_textures() {
        let plan = BindingPlan::new(3, 2, 2);
        assert_eq!(plan.uniform_binding(0), 3);
        assert_eq!(plan.uniform_binding(1), 4);
        assert_eq!(plan.texture_binding(0), 5);
        assert_eq!(plan.texture_binding(1), 6);
        assert_eq!(plan.sampler_binding(), 7);
    }

    #[test]
    fn sampler_directly_follows_uniforms_without_textures() {
        let plan = BindingPlan::new(2, 0, 0);
        assert_eq!(plan.sampler_binding(), 2);
    }

    #[test]
    fn default_sampler_config_is_linear_repeat() {
        let config = SamplerConfig::default();
        assert_eq!(config.min_filter, wgpu::FilterMode::Linear);
        assert_eq!(config.mag_filter, wgpu::FilterMode::Linear);
        assert_eq!(config.wrap_u, wgpu::AddressMode::Repeat);
        assert_eq!(config.wrap_v, wgpu::AddressMode::Repeat);
    }
}
