//! wgpu Device
//!
//! [`WgpuDevice`] executes the resource layer's commands on a real GPU.
//!
//! # Render target
//!
//! By default frames render into an offscreen color texture
//! (`Rgba8UnormSrgb`) with a `Depth32Float` depth buffer, readable with
//! [`WgpuDevice::read_target_rgba`]. A windowing layer can redirect output
//! to a surface texture with [`WgpuDevice::set_target_view`].
//!
//! # Bindings
//!
//! | Group | Binding | Content                                           |
//! |-------|---------|---------------------------------------------------|
//! | 0     | 0       | Program uniform block (dynamic offset per draw)   |
//! | 1     | 0       | Material texture (`texture_2d<f32>`), optional    |
//! | 1     | 1       | Material sampler, optional                        |
//!
//! # Submission
//!
//! [`GpuDevice::submit`] runs in two phases. The first walks the command list,
//! packs every uniform snapshot into a per-frame arena and creates missing
//! pipelines. The second encodes a single render pass that only borrows what
//! the first phase prepared.

use std::num::NonZeroU64;
use std::ops::Range;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::errors::{KilnError, Result, ShaderStage};
use crate::renderer::device::{
    BufferDescriptor, DrawCommand, GpuDevice, RawResource, ResourceId, TextureDescriptor,
    VertexStream,
};
use crate::renderer::mapping::{
    expand_rgb_to_rgba, to_address_mode, to_backend_index_format, to_backend_texture_format,
    to_backend_vertex_format, to_filter_mode, to_mipmap_filter, upload_format,
};
use crate::renderer::shader_compiler::CompiledProgram;
use crate::resources::buffer::BufferUsage;
use crate::resources::format::{Dimension, ElementType, Format};
use crate::resources::texture::TextureKind;
use crate::settings::DeviceSettings;

const DEFAULT_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ============================================================================
// Device objects
// ============================================================================

struct ProgramObject {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    vertex_entry: String,
    fragment_entry: String,
    inputs: Vec<u32>,
    samples_material_texture: bool,
    layout: wgpu::PipelineLayout,
}

enum GpuObject {
    Buffer(wgpu::Buffer),
    Texture {
        _texture: wgpu::Texture,
        /// Present for filterable 2D textures only.
        material: Option<wgpu::BindGroup>,
    },
    Program(ProgramObject),
}

struct RenderTarget {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Kiln Color Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEFAULT_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = Self::create_depth(device, width, height);
        Self {
            color,
            color_view,
            depth_view,
            width,
            height,
        }
    }

    fn create_depth(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Kiln Depth Target"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }
}

/// Surface view supplied by a windowing layer.
struct ExternalTarget {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

// ============================================================================
// Pipeline cache
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StreamKey {
    location: u32,
    stride: u64,
    format: Format,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ResourceId,
    color_format: wgpu::TextureFormat,
    streams: SmallVec<[StreamKey; 4]>,
}

/// A draw with everything resolved by the planning phase.
struct PlannedDraw {
    pipeline: PipelineKey,
    uniform_offset: u32,
    /// Streams feeding `pipeline.streams`, in the same order.
    streams: SmallVec<[VertexStream; 4]>,
    index: (ResourceId, Format),
    texture: Option<ResourceId>,
    samples_material_texture: bool,
    indices: Range<u32>,
    base_vertex: i32,
}

/// Per-frame uniform storage addressed with dynamic offsets.
struct UniformArena {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
    slot_size: u64,
}

// ============================================================================
// Device
// ============================================================================

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    clear_color: wgpu::Color,
    target: RenderTarget,
    external: Option<ExternalTarget>,

    objects: SlotMap<ResourceId, GpuObject>,
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,

    uniform_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    fallback_material: wgpu::BindGroup,
    arena: Option<UniformArena>,
    max_uniform_size: u32,
    uniform_alignment: u32,
}

impl WgpuDevice {
    /// Requests an adapter and device and sets up the offscreen target.
    pub async fn new(settings: &DeviceSettings) -> Result<Self> {
        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| KilnError::AdapterRequestFailed(e.to_string()))?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Kiln Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        Ok(Self::from_device(device, queue, settings))
    }

    /// [`new`](Self::new) driven to completion on the current thread.
    pub fn new_blocking(settings: &DeviceSettings) -> Result<Self> {
        pollster::block_on(Self::new(settings))
    }

    /// Wraps an existing device, e.g. one shared with a windowing layer.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue, settings: &DeviceSettings) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Kiln Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Kiln Material Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniform_alignment = device.limits().min_uniform_buffer_offset_alignment;
        let target = RenderTarget::new(&device, settings.target_width.max(1), settings.target_height.max(1));

        let mut this = Self {
            fallback_material: Self::create_fallback_material(&device, &queue, &material_layout),
            device,
            queue,
            clear_color: settings.wgpu_clear_color(),
            target,
            external: None,
            objects: SlotMap::with_key(),
            pipelines: FxHashMap::default(),
            uniform_layout,
            material_layout,
            arena: None,
            max_uniform_size: 16,
            uniform_alignment,
        };
        this.ensure_arena(1);
        this
    }

    fn create_fallback_material(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::BindGroup {
        let white: &[u8] = &[0xFF; 4];
        let (_texture, view) =
            Self::upload_2d(device, queue, "Kiln White", 1, 1, wgpu::TextureFormat::Rgba8Unorm, &[white], 4);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Kiln Fallback Material"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        })
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Size of the current render target.
    #[must_use]
    pub fn target_size(&self) -> (u32, u32) {
        match &self.external {
            Some(external) => (external.width, external.height),
            None => (self.target.width, self.target.height),
        }
    }

    /// Renders subsequent frames into `view` (typically a surface texture).
    pub fn set_target_view(&mut self, view: wgpu::TextureView, format: wgpu::TextureFormat, width: u32, height: u32) {
        let depth_view = match self.external.take() {
            Some(old) if (old.width, old.height) == (width, height) => old.depth_view,
            _ => RenderTarget::create_depth(&self.device, width, height),
        };
        self.external = Some(ExternalTarget {
            view,
            format,
            depth_view,
            width,
            height,
        });
    }

    /// Goes back to the offscreen target.
    pub fn clear_target_view(&mut self) {
        self.external = None;
    }

    /// Resizes the offscreen target.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 && (width, height) != (self.target.width, self.target.height) {
            self.target = RenderTarget::new(&self.device, width, height);
        }
    }

    fn color_format(&self) -> wgpu::TextureFormat {
        self.external.as_ref().map_or(DEFAULT_COLOR_FORMAT, |e| e.format)
    }

    // ------------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------------

    /// Creates a texture and fills each array layer.
    fn upload_2d(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        layers: &[&[u8]],
        texel_size: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: layers.len() as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, data) in layers.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * texel_size),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Creates a shader module. Device validation errors come back as
    /// [`KilnError::ShaderCompileError`].
    fn checked_module(&self, label: &str, source: &str, stage: ShaderStage) -> Result<wgpu::ShaderModule> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} ({stage})")),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        match pollster::block_on(scope.pop()) {
            Some(error) => Err(KilnError::ShaderCompileError {
                stage,
                label: label.to_string(),
                message: error.to_string(),
            }),
            None => Ok(module),
        }
    }

    // ------------------------------------------------------------------------
    // Uniform arena
    // ------------------------------------------------------------------------

    fn slot_size(&self) -> u64 {
        u64::from(self.max_uniform_size.max(16).next_multiple_of(self.uniform_alignment))
    }

    /// Makes sure the arena holds `slots` uniform blocks of the current slot size.
    fn ensure_arena(&mut self, slots: usize) {
        let slot_size = self.slot_size();
        let needed = slot_size * slots.max(1) as u64;
        if let Some(arena) = &self.arena
            && arena.capacity >= needed
            && arena.slot_size == slot_size
        {
            return;
        }

        let capacity = needed.next_power_of_two().max(slot_size);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Kiln Uniform Arena"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Kiln Uniform Bind Group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(slot_size),
                }),
            }],
        });
        log::debug!("Uniform arena: {capacity} bytes, {slot_size}-byte slots");
        self.arena = Some(UniformArena {
            buffer,
            bind_group,
            capacity,
            slot_size,
        });
    }

    // ------------------------------------------------------------------------
    // Pipelines
    // ------------------------------------------------------------------------

    fn ensure_pipeline(&mut self, key: &PipelineKey) -> bool {
        if self.pipelines.contains_key(key) {
            return true;
        }
        let Some(GpuObject::Program(program)) = self.objects.get(key.program) else {
            return false;
        };

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
            .streams
            .iter()
            .map(|s| {
                [wgpu::VertexAttribute {
                    format: to_backend_vertex_format(s.format),
                    offset: 0,
                    shader_location: s.location,
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
            .streams
            .iter()
            .zip(&attributes)
            .map(|(s, attributes)| wgpu::VertexBufferLayout {
                array_stride: s.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Kiln Pipeline"),
            layout: Some(&program.layout),
            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: Some(&program.vertex_entry),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: Some(&program.fragment_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: Some(true),
                depth_compare: Some(wgpu::CompareFunction::Less),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("Created pipeline for program {:?} ({} streams)", key.program, key.streams.len());
        self.pipelines.insert(key.clone(), pipeline);
        true
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    /// Phase 1: resolve state, pack uniforms, build pipelines.
    fn plan(&mut self, commands: &[DrawCommand]) -> (Vec<PlannedDraw>, Vec<u8>) {
        let slot_size = self.slot_size() as usize;
        let color_format = self.color_format();

        let mut draws = Vec::new();
        let mut uniforms = Vec::new();

        let mut program: Option<(ResourceId, u32)> = None;
        let mut streams: SmallVec<[VertexStream; 4]> = SmallVec::new();
        let mut index: Option<(ResourceId, Format)> = None;
        let mut texture: Option<ResourceId> = None;

        for command in commands {
            match command {
                DrawCommand::SetProgram { program: id, uniforms: block } => {
                    let offset = uniforms.len();
                    uniforms.extend_from_slice(&block[..block.len().min(slot_size)]);
                    uniforms.resize(offset + slot_size, 0);
                    program = Some((*id, offset as u32));
                }
                DrawCommand::SetVertexStreams(bound) => streams.clone_from(bound),
                DrawCommand::SetIndexBuffer { buffer, format } => index = Some((*buffer, *format)),
                DrawCommand::BindTexture { unit: 0, texture: id } => texture = Some(*id),
                DrawCommand::UnbindTexture { unit: 0 } => texture = None,
                DrawCommand::BindTexture { unit, .. } | DrawCommand::UnbindTexture { unit } => {
                    log::trace!("Texture unit {unit} is not bound by the wgpu device");
                }
                DrawCommand::DrawIndexed { indices, base_vertex } => {
                    let (Some((program_id, uniform_offset)), Some(index)) = (program, index) else {
                        continue;
                    };
                    let Some(GpuObject::Program(object)) = self.objects.get(program_id) else {
                        log::warn!("Draw with destroyed program {program_id:?}");
                        continue;
                    };

                    let mut used: SmallVec<[VertexStream; 4]> = SmallVec::new();
                    for location in &object.inputs {
                        match streams.iter().find(|s| s.location == *location) {
                            Some(stream) => used.push(*stream),
                            None => {
                                log::warn!("Skipping draw: no stream for @location({location})");
                                used.clear();
                                break;
                            }
                        }
                    }
                    if used.len() != object.inputs.len() {
                        continue;
                    }

                    let key = PipelineKey {
                        program: program_id,
                        color_format,
                        streams: used
                            .iter()
                            .map(|s| StreamKey {
                                location: s.location,
                                stride: s.stride,
                                format: s.format,
                            })
                            .collect(),
                    };
                    let samples_material_texture = object.samples_material_texture;
                    if !self.ensure_pipeline(&key) {
                        continue;
                    }

                    draws.push(PlannedDraw {
                        pipeline: key,
                        uniform_offset,
                        streams: used,
                        index,
                        texture,
                        samples_material_texture,
                        indices: indices.clone(),
                        base_vertex: *base_vertex,
                    });
                }
            }
        }

        (draws, uniforms)
    }

    fn buffer(&self, id: ResourceId) -> Option<&wgpu::Buffer> {
        match self.objects.get(id)? {
            GpuObject::Buffer(buffer) => Some(buffer),
            _ => None,
        }
    }

    /// Phase 2: encode and submit.
    fn encode(&self, draws: &[PlannedDraw]) {
        let Some(arena) = &self.arena else { return };
        let (color_view, depth_view) = match &self.external {
            Some(external) => (&external.view, &external.depth_view),
            None => (&self.target.color_view, &self.target.depth_view),
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Kiln Frame Encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Kiln Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for draw in draws {
                let Some(pipeline) = self.pipelines.get(&draw.pipeline) else { continue };
                let Some(index_buffer) = self.buffer(draw.index.0) else { continue };

                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &arena.bind_group, &[draw.uniform_offset]);

                if draw.samples_material_texture {
                    let material = draw
                        .texture
                        .and_then(|id| match self.objects.get(id) {
                            Some(GpuObject::Texture { material, .. }) => material.as_ref(),
                            _ => None,
                        })
                        .unwrap_or(&self.fallback_material);
                    pass.set_bind_group(1, material, &[]);
                }

                let mut complete = true;
                for (slot, stream) in draw.streams.iter().enumerate() {
                    let Some(buffer) = self.buffer(stream.buffer) else {
                        complete = false;
                        break;
                    };
                    pass.set_vertex_buffer(slot as u32, buffer.slice(stream.offset..stream.offset + stream.size));
                }
                if !complete {
                    log::warn!("Skipping draw: vertex buffer was destroyed");
                    continue;
                }

                pass.set_index_buffer(index_buffer.slice(..), to_backend_index_format(draw.index.1));
                pass.draw_indexed(draw.indices.clone(), draw.base_vertex, 0..1);
            }
        }

        self.queue.submit(Some(encoder.finish()));
    }

    /// Copies the offscreen color target to host memory as tightly packed RGBA8.
    pub fn read_target_rgba(&self) -> Result<Vec<u8>> {
        let (width, height) = (self.target.width, self.target.height);
        let unpadded = width * 4;
        let padded = unpadded.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Kiln Readback"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Kiln Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let submission = self.queue.submit(Some(encoder.finish()));

        let (tx, rx) = flume::bounded(1);
        staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: None,
            })
            .map_err(|e| KilnError::GpuOperationFailed(format!("device poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|e| KilnError::GpuOperationFailed(e.to_string()))?
            .map_err(|e| KilnError::GpuOperationFailed(e.to_string()))?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let mapped = staging.slice(..).get_mapped_range();
            for row in mapped.chunks_exact(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        staging.unmap();
        Ok(pixels)
    }
}

/// Converts texel data to a layout every adapter can sample with filtering:
/// three components gain an alpha, 32-bit floats and 16-bit unorm become
/// half floats.
fn prepare_texels(format: Format, data: &[u8]) -> (Format, Vec<u8>) {
    let expanded = expand_rgb_to_rgba(format, data);
    let format = upload_format(format);
    let half = Format::new(ElementType::Float16, format.dimension);

    match format.element {
        ElementType::Float32 => {
            let floats: Vec<f32> = bytemuck::pod_collect_to_vec(&expanded);
            let halves: Vec<u16> = floats.iter().map(|v| half::f16::from_f32(*v).to_bits()).collect();
            (half, bytemuck::cast_slice(&halves).to_vec())
        }
        ElementType::UInt16 => {
            let shorts: Vec<u16> = bytemuck::pod_collect_to_vec(&expanded);
            let halves: Vec<u16> = shorts
                .iter()
                .map(|v| half::f16::from_f32(f32::from(*v) / f32::from(u16::MAX)).to_bits())
                .collect();
            (half, bytemuck::cast_slice(&halves).to_vec())
        }
        _ => (format, expanded),
    }
}

impl GpuDevice for WgpuDevice {
    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> ResourceId {
        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
        } | wgpu::BufferUsages::COPY_DST;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: desc.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
            usage,
            mapped_at_creation: false,
        });
        self.objects.insert(GpuObject::Buffer(buffer))
    }

    fn write_buffer(&mut self, buffer: ResourceId, offset: u64, data: &[u8]) {
        let Some(target) = self.buffer(buffer) else {
            log::warn!("write_buffer on unknown buffer {buffer:?}");
            return;
        };
        let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
        if data.len() % align == 0 {
            self.queue.write_buffer(target, offset, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(data.len().next_multiple_of(align), 0);
            self.queue.write_buffer(target, offset, &padded);
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>, layers: &[&[u8]]) -> ResourceId {
        let prepared: Vec<(Format, Vec<u8>)> = layers.iter().map(|l| prepare_texels(desc.format, l)).collect();
        let gpu_format = prepared.first().map_or(desc.format, |(f, _)| *f);
        let wgpu_format = to_backend_texture_format(gpu_format);
        let data: Vec<&[u8]> = prepared.iter().map(|(_, d)| d.as_slice()).collect();

        let (texture, _) = Self::upload_2d(
            &self.device,
            &self.queue,
            desc.label,
            desc.width,
            desc.height,
            wgpu_format,
            &data,
            gpu_format.stride() as u32,
        );

        let filterable = matches!(gpu_format.element, ElementType::UInt8 | ElementType::Float16)
            && gpu_format.dimension != Dimension::Vec3;
        let material = (filterable && desc.kind == TextureKind::Tex2D).then(|| {
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let wrap = to_address_mode(desc.sampler.wrap);
            let filter = to_filter_mode(desc.sampler.filter);
            let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(desc.label),
                address_mode_u: wrap,
                address_mode_v: wrap,
                address_mode_w: wrap,
                mag_filter: filter,
                min_filter: filter,
                mipmap_filter: to_mipmap_filter(desc.sampler.filter),
                ..Default::default()
            });
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(desc.label),
                layout: &self.material_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            })
        });

        self.objects.insert(GpuObject::Texture {
            _texture: texture,
            material,
        })
    }

    fn create_program(&mut self, program: &CompiledProgram) -> Result<ResourceId> {
        let vertex = self.checked_module(&program.label, &program.vertex.source, ShaderStage::Vertex)?;
        let fragment = self.checked_module(&program.label, &program.fragment.source, ShaderStage::Fragment)?;

        let mut groups = vec![Some(&self.uniform_layout)];
        if program.samples_material_texture {
            groups.push(Some(&self.material_layout));
        }
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&program.label),
            bind_group_layouts: &groups,
            immediate_size: 0,
        });
        if let Some(error) = pollster::block_on(scope.pop()) {
            return Err(KilnError::ShaderLinkError {
                label: program.label.clone(),
                message: error.to_string(),
            });
        }

        self.max_uniform_size = self.max_uniform_size.max(program.uniforms.size());

        Ok(self.objects.insert(GpuObject::Program(ProgramObject {
            vertex,
            fragment,
            vertex_entry: program.vertex.entry_point.clone(),
            fragment_entry: program.fragment.entry_point.clone(),
            inputs: program.vertex_inputs.clone(),
            samples_material_texture: program.samples_material_texture,
            layout,
        })))
    }

    fn submit(&mut self, commands: &[DrawCommand]) {
        let (draws, uniforms) = self.plan(commands);
        let slots = uniforms.len() / self.slot_size() as usize;
        self.ensure_arena(slots);
        if let Some(arena) = &self.arena
            && !uniforms.is_empty()
        {
            self.queue.write_buffer(&arena.buffer, 0, &uniforms);
        }
        self.encode(&draws);
    }

    fn destroy(&mut self, resource: RawResource) {
        match self.objects.remove(resource.id) {
            Some(GpuObject::Buffer(buffer)) => buffer.destroy(),
            Some(GpuObject::Program(_)) => self.pipelines.retain(|key, _| key.program != resource.id),
            Some(GpuObject::Texture { .. }) | None => {}
        }
    }
}
