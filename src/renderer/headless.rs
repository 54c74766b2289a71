//! Headless Device
//!
//! A [`GpuDevice`] without a GPU. Buffers and textures are mirrored in host
//! memory and every submitted frame is recorded, which makes it suitable for
//! asset tooling and for inspecting exactly what the resource layer sent to
//! the device. Long-running tools should drain the history with
//! [`HeadlessDevice::take_frames`] or [`HeadlessDevice::clear_history`].

use slotmap::SlotMap;

use crate::errors::Result;
use crate::renderer::device::{
    BufferDescriptor, DrawCommand, GpuDevice, RawResource, ResourceId, TextureDescriptor,
};
use crate::renderer::shader_compiler::CompiledProgram;
use crate::resources::buffer::BufferUsage;
use crate::resources::format::Format;
use crate::resources::texture::TextureKind;

#[derive(Debug, Clone)]
pub struct HeadlessBuffer {
    pub label: String,
    pub usage: BufferUsage,
    pub data: Vec<u8>,
    /// Number of `write_buffer` calls.
    pub writes: u32,
}

#[derive(Debug, Clone)]
pub struct HeadlessTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub kind: TextureKind,
    pub layers: Vec<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct HeadlessProgram {
    pub label: String,
    pub uniform_size: u32,
}

#[derive(Debug)]
enum Object {
    Buffer(HeadlessBuffer),
    Texture(HeadlessTexture),
    Program(HeadlessProgram),
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    objects: SlotMap<ResourceId, Object>,
    frames: Vec<Vec<DrawCommand>>,
    destroyed: Vec<RawResource>,
    buffer_writes: u32,
    texture_uploads: u32,
}

impl HeadlessDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn buffer(&self, id: ResourceId) -> Option<&HeadlessBuffer> {
        match self.objects.get(id)? {
            Object::Buffer(buffer) => Some(buffer),
            _ => None,
        }
    }

    #[must_use]
    pub fn texture(&self, id: ResourceId) -> Option<&HeadlessTexture> {
        match self.objects.get(id)? {
            Object::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    #[must_use]
    pub fn program(&self, id: ResourceId) -> Option<&HeadlessProgram> {
        match self.objects.get(id)? {
            Object::Program(program) => Some(program),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_alive(&self, id: ResourceId) -> bool {
        self.objects.contains_key(id)
    }

    /// Live device objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Submitted frames, oldest first.
    #[must_use]
    pub fn frames(&self) -> &[Vec<DrawCommand>] {
        &self.frames
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<&[DrawCommand]> {
        self.frames.last().map(Vec::as_slice)
    }

    /// Objects destroyed so far, in destruction order.
    #[must_use]
    pub fn destroyed(&self) -> &[RawResource] {
        &self.destroyed
    }

    /// Removes and returns the recorded frames.
    pub fn take_frames(&mut self) -> Vec<Vec<DrawCommand>> {
        std::mem::take(&mut self.frames)
    }

    /// Forgets recorded frames and destroyed objects. Live objects and the
    /// upload counters are kept.
    pub fn clear_history(&mut self) {
        self.frames.clear();
        self.destroyed.clear();
    }

    /// Total `write_buffer` calls.
    #[must_use]
    pub fn buffer_writes(&self) -> u32 {
        self.buffer_writes
    }

    /// Total `create_texture` calls.
    #[must_use]
    pub fn texture_uploads(&self) -> u32 {
        self.texture_uploads
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> ResourceId {
        self.objects.insert(Object::Buffer(HeadlessBuffer {
            label: desc.label.to_string(),
            usage: desc.usage,
            data: vec![0; desc.size as usize],
            writes: 0,
        }))
    }

    fn write_buffer(&mut self, buffer: ResourceId, offset: u64, data: &[u8]) {
        let Some(Object::Buffer(target)) = self.objects.get_mut(buffer) else {
            log::warn!("write_buffer on unknown buffer {buffer:?}");
            return;
        };
        let start = offset as usize;
        target.data[start..start + data.len()].copy_from_slice(data);
        target.writes += 1;
        self.buffer_writes += 1;
    }

    fn create_texture(&mut self, desc: &TextureDescriptor<'_>, layers: &[&[u8]]) -> ResourceId {
        self.texture_uploads += 1;
        self.objects.insert(Object::Texture(HeadlessTexture {
            label: desc.label.to_string(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            kind: desc.kind,
            layers: layers.iter().map(|l| l.to_vec()).collect(),
        }))
    }

    fn create_program(&mut self, program: &CompiledProgram) -> Result<ResourceId> {
        Ok(self.objects.insert(Object::Program(HeadlessProgram {
            label: program.label.clone(),
            uniform_size: program.uniforms.size(),
        })))
    }

    fn submit(&mut self, commands: &[DrawCommand]) {
        self.frames.push(commands.to_vec());
    }

    fn destroy(&mut self, resource: RawResource) {
        if self.objects.remove(resource.id).is_some() {
            self.destroyed.push(resource);
        }
    }
}
