//! Frame Backend
//!
//! [`Backend`] records one frame of GPU state changes and draws:
//!
//! 1. **Sync**: binding a vertex or index buffer first uploads its pending
//!    CPU changes. This is the only point where buffer data reaches the GPU.
//! 2. **Record**: bindings, attribute layouts, programs and draws are
//!    appended to the frame's command list.
//! 3. **Submit**: [`Backend::end_frame`] hands the list to the device, then
//!    destroys every resource released during the frame.
//!
//! Releasing a resource that is still bound in the current frame is the
//! caller's mistake and is not detected.

use std::ops::Range;

use glam::Mat4;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::assets::texture_cache::TextureCache;
use crate::renderer::context::GpuContext;
use crate::renderer::device::{DrawCommand, GpuDevice, RawResource, ResourceId, ResourceKind, VertexStream};
use crate::renderer::shader::Shader;
use crate::resources::buffer::{BufferRef, BufferView};
use crate::resources::format::Format;
use crate::resources::model::{Attribute, Model, Slot};
use crate::resources::texture::Texture;

/// Counters for one submitted frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: u32,
    /// Draws dropped because a program, index buffer or vertex layout was missing.
    pub skipped_draws: u32,
    pub buffer_uploads: u32,
    /// GPU objects destroyed after submission.
    pub released: u32,
}

#[derive(Default)]
pub struct Backend {
    commands: Vec<DrawCommand>,
    pending_release: Vec<RawResource>,
    vertex_buffer: Option<ResourceId>,
    index_buffer: Option<ResourceId>,
    has_streams: bool,
    has_program: bool,
    stats: FrameStats,
}

impl Backend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands recorded so far this frame.
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Resources queued through [`release_resource`](Self::release_resource).
    #[must_use]
    pub fn pending_releases(&self) -> &[RawResource] {
        &self.pending_release
    }

    fn sync<D: GpuDevice>(&mut self, ctx: &mut GpuContext<D>, buffer: &BufferRef) -> Option<ResourceId> {
        let mut buffer = buffer.write();
        if buffer.is_dirty() && !buffer.is_empty() {
            self.stats.buffer_uploads += 1;
        }
        buffer.sync(ctx)
    }

    /// Syncs `buffer` and makes it the source for the next
    /// [`enable_attributes`](Self::enable_attributes).
    pub fn set_vertex_buffer<D: GpuDevice>(&mut self, ctx: &mut GpuContext<D>, buffer: &BufferRef) {
        self.vertex_buffer = self.sync(ctx, buffer);
        if self.vertex_buffer.is_none() {
            log::warn!("Vertex buffer '{}' is empty", buffer.read().label());
        }
    }

    /// Syncs `buffer` and binds it as the index source. `format` is
    /// `UInt16` or `UInt32` scalar.
    pub fn set_index_buffer<D: GpuDevice>(&mut self, ctx: &mut GpuContext<D>, buffer: &BufferRef, format: Format) {
        self.index_buffer = self.sync(ctx, buffer);
        match self.index_buffer {
            Some(buffer) => self.commands.push(DrawCommand::SetIndexBuffer { buffer, format }),
            None => log::warn!("Index buffer '{}' is empty", buffer.read().label()),
        }
    }

    /// Points each attribute's shader slot at its view inside the bound
    /// vertex buffer. Attributes without a view are left disabled.
    pub fn enable_attributes(&mut self, attributes: &[Attribute], views: &FxHashMap<Slot, BufferView>) {
        let Some(buffer) = self.vertex_buffer else {
            log::warn!("enable_attributes called without a vertex buffer");
            self.has_streams = false;
            return;
        };

        let streams: SmallVec<[VertexStream; 4]> = attributes
            .iter()
            .filter_map(|attribute| {
                let Some(view) = views.get(&attribute.slot) else {
                    log::warn!("No buffer view for {:?}", attribute.slot);
                    return None;
                };
                Some(VertexStream {
                    buffer,
                    location: attribute.slot.location(),
                    offset: view.offset as u64,
                    size: view.size as u64,
                    stride: view.stride() as u64,
                    format: attribute.format,
                })
            })
            .collect();

        self.has_streams = !streams.is_empty();
        self.commands.push(DrawCommand::SetVertexStreams(streams));
    }

    /// Activates `shader` with its current uniform values.
    pub fn set_shader(&mut self, shader: &Shader) {
        self.has_program = true;
        self.commands.push(DrawCommand::SetProgram {
            program: shader.id(),
            uniforms: shader.uniform_bytes(),
        });
    }

    pub fn bind_texture(&mut self, unit: u32, texture: &Texture) {
        self.commands.push(DrawCommand::BindTexture {
            unit,
            texture: texture.id(),
        });
    }

    pub fn unbind_texture(&mut self, unit: u32) {
        self.commands.push(DrawCommand::UnbindTexture { unit });
    }

    /// Draws `indices` of the bound index buffer.
    pub fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32) {
        if !(self.has_program && self.has_streams && self.index_buffer.is_some()) {
            log::warn!(
                "Skipping draw: program={} streams={} index buffer={}",
                self.has_program,
                self.has_streams,
                self.index_buffer.is_some()
            );
            self.stats.skipped_draws += 1;
            return;
        }
        if indices.is_empty() {
            return;
        }
        self.stats.draw_calls += 1;
        self.commands.push(DrawCommand::DrawIndexed { indices, base_vertex });
    }

    /// Draws every sub-mesh of `model` placed at `transform`.
    ///
    /// Per sub-mesh the material's shader gets `model` (world matrix) plus
    /// the material uniforms. When the shader samples a material texture,
    /// unit 0 gets the albedo map, or is cleared if the map does not resolve
    /// in `textures`; `has_albedo_map` reports which of the two happened.
    pub fn draw_model<D: GpuDevice>(
        &mut self,
        ctx: &mut GpuContext<D>,
        model: &Model,
        transform: Mat4,
        textures: &TextureCache,
    ) {
        for mesh in model.meshes() {
            self.set_vertex_buffer(ctx, &mesh.vertex_buffer);
            self.set_index_buffer(ctx, &mesh.index_buffer, mesh.index_format);
            self.enable_attributes(&mesh.attributes, &mesh.views);

            let world = transform * mesh.matrix;
            for sub_mesh in &mesh.sub_meshes {
                let Some(binding) = model.material(sub_mesh.material) else {
                    log::warn!("Model '{}' has no material {}", model.name, sub_mesh.material);
                    self.stats.skipped_draws += 1;
                    continue;
                };

                let shader = &binding.shader;
                shader.set_uniform_mat4("model", world);
                binding.material.apply(shader);

                let mut has_albedo_map = false;
                if shader.samples_material_texture() {
                    match binding.material.albedo_map.and_then(|h| textures.get(h)) {
                        Some(texture) => {
                            self.bind_texture(0, texture);
                            has_albedo_map = true;
                        }
                        None => self.unbind_texture(0),
                    }
                }
                shader.set_uniform_1i("has_albedo_map", i32::from(has_albedo_map));
                self.set_shader(shader);
                self.draw_indexed(sub_mesh.range(), 0);
            }
        }
    }

    /// Queues a device object for destruction after this frame is submitted.
    pub fn release_resource(&mut self, id: ResourceId, kind: ResourceKind) {
        self.pending_release.push(RawResource { id, kind });
    }

    /// Submits the frame, then destroys everything released during it.
    pub fn end_frame<D: GpuDevice>(&mut self, ctx: &mut GpuContext<D>) -> FrameStats {
        ctx.submit(&self.commands);

        for resource in self.pending_release.drain(..) {
            ctx.release(resource);
        }
        let mut stats = std::mem::take(&mut self.stats);
        stats.released = ctx.drain_releases() as u32;

        self.commands.clear();
        self.vertex_buffer = None;
        self.index_buffer = None;
        self.has_streams = false;
        self.has_program = false;

        log::trace!("Frame submitted: {stats:?}");
        stats
    }
}
