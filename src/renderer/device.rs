//! GPU Device Abstraction
//!
//! [`GpuDevice`] is the seam between the resource layer and a concrete GPU
//! API. Everything above it (buffers, textures, shaders, the backend) only
//! speaks in [`ResourceId`]s and [`DrawCommand`]s; the device owns the real
//! API objects.
//!
//! Two devices ship with the crate:
//! - [`WgpuDevice`](super::wgpu_device::WgpuDevice): renders through `wgpu`.
//! - [`HeadlessDevice`](super::headless::HeadlessDevice): mirrors uploads in
//!   memory and records submitted frames, for tools and tests.

use std::ops::Range;

use smallvec::SmallVec;

use crate::errors::Result;
use crate::renderer::shader_compiler::CompiledProgram;
use crate::resources::buffer::BufferUsage;
use crate::resources::format::Format;
use crate::resources::texture::{TextureKind, TextureSampler};

slotmap::new_key_type! {
    /// Generation-checked handle to an object owned by a [`GpuDevice`].
    pub struct ResourceId;
}

/// What a [`ResourceId`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    VertexBuffer,
    IndexBuffer,
    UniformBuffer,
    Texture,
    Program,
}

impl From<BufferUsage> for ResourceKind {
    fn from(usage: BufferUsage) -> Self {
        match usage {
            BufferUsage::Vertex => Self::VertexBuffer,
            BufferUsage::Index => Self::IndexBuffer,
            BufferUsage::Uniform => Self::UniformBuffer,
        }
    }
}

/// A device handle tagged with its kind. Carries no ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawResource {
    pub id: ResourceId,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub usage: BufferUsage,
    /// Size in bytes.
    pub size: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct TextureDescriptor<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    /// Texel layout of the data passed alongside this descriptor.
    pub format: Format,
    pub kind: TextureKind,
    pub sampler: TextureSampler,
}

impl TextureDescriptor<'_> {
    /// Number of array layers: 6 for cube maps, 1 otherwise.
    #[inline]
    #[must_use]
    pub fn layer_count(&self) -> u32 {
        match self.kind {
            TextureKind::Tex2D => 1,
            TextureKind::TexCube => 6,
        }
    }

    /// Bytes expected per layer.
    #[inline]
    #[must_use]
    pub fn layer_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.stride()
    }
}

/// One bound vertex attribute stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexStream {
    pub buffer: ResourceId,
    /// Shader input location.
    pub location: u32,
    /// Byte offset of the stream inside the buffer.
    pub offset: u64,
    /// Byte length of the stream.
    pub size: u64,
    pub stride: u64,
    pub format: Format,
}

/// Recorded GPU state change or draw, submitted once per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Activate a program with a snapshot of its uniform block.
    SetProgram {
        program: ResourceId,
        uniforms: Vec<u8>,
    },
    /// Replace the active vertex layout.
    SetVertexStreams(SmallVec<[VertexStream; 4]>),
    SetIndexBuffer {
        buffer: ResourceId,
        format: Format,
    },
    /// Bind a texture to a sampler unit of the active program.
    BindTexture {
        unit: u32,
        texture: ResourceId,
    },
    /// Clear a sampler unit; the program samples the device's fallback texture.
    UnbindTexture {
        unit: u32,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
    },
}

/// A GPU API the resource layer can drive.
///
/// Handles are never reused by a device while alive; destroying an unknown
/// or already-destroyed handle must be a no-op.
pub trait GpuDevice {
    /// Allocates an uninitialized buffer of `desc.size` bytes.
    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> ResourceId;

    /// Overwrites bytes of a buffer starting at `offset`.
    fn write_buffer(&mut self, buffer: ResourceId, offset: u64, data: &[u8]);

    /// Creates and fills a texture. `layers` holds one slice per array
    /// layer, each [`TextureDescriptor::layer_size`] bytes.
    fn create_texture(&mut self, desc: &TextureDescriptor<'_>, layers: &[&[u8]]) -> ResourceId;

    /// Creates a program from validated shader stages.
    fn create_program(&mut self, program: &CompiledProgram) -> Result<ResourceId>;

    /// Executes one frame of recorded commands.
    fn submit(&mut self, commands: &[DrawCommand]);

    /// Frees the device object behind `resource`.
    fn destroy(&mut self, resource: RawResource);
}
