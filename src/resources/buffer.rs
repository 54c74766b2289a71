//! CPU-side Buffers
//!
//! A [`Buffer`] owns a block of bytes and mirrors it to a GPU buffer. All
//! mutation APIs touch CPU memory only and mark the buffer dirty; the upload
//! happens in [`Buffer::sync`], which the backend calls right before binding.
//! Several writes within a frame therefore cost a single upload.
//!
//! [`BufferView`] is a typed window into a buffer describing one attribute
//! stream (sequential or interleaved layouts both work).

use std::ops::Range;
use std::sync::Arc;

use bytemuck::Pod;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::renderer::context::{GpuContext, GpuResource};
use crate::renderer::device::{BufferDescriptor, GpuDevice, ResourceId};
use crate::resources::format::Format;

/// What the GPU copy of a buffer is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

/// CPU byte block with a lazily created GPU mirror.
///
/// Invariant: when `is_dirty()` is false and a GPU resource exists, its
/// contents equal [`data`](Self::data).
#[derive(Debug)]
pub struct Buffer {
    label: String,
    usage: BufferUsage,
    data: Vec<u8>,
    dirty: bool,
    gpu: Option<GpuResource>,
}

impl Buffer {
    /// Empty buffer. Nothing to upload until data is written.
    pub fn new(usage: BufferUsage, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            usage,
            data: Vec::new(),
            dirty: false,
            gpu: None,
        }
    }

    /// Zero-filled buffer of `size` bytes.
    pub fn with_size(size: usize, usage: BufferUsage, label: impl Into<String>) -> Self {
        let mut buffer = Self::new(usage, label);
        buffer.resize(size);
        buffer
    }

    pub fn from_bytes(data: &[u8], usage: BufferUsage, label: impl Into<String>) -> Self {
        let mut buffer = Self::new(usage, label);
        buffer.set_data(data);
        buffer
    }

    pub fn from_slice<T: Pod>(data: &[T], usage: BufferUsage, label: impl Into<String>) -> Self {
        Self::from_bytes(bytemuck::cast_slice(data), usage, label)
    }

    // === Accessors ===

    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    #[must_use]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The GPU mirror, if the buffer has been synced at least once.
    #[inline]
    #[must_use]
    pub fn gpu_resource(&self) -> Option<&GpuResource> {
        self.gpu.as_ref()
    }

    // === CPU mutation ===

    /// Replaces the contents wholesale.
    pub fn set_data(&mut self, bytes: &[u8]) {
        if self.data.len() == bytes.len() {
            self.data.copy_from_slice(bytes);
        } else {
            self.data = bytes.to_vec();
        }
        self.dirty = true;
    }

    pub fn set_slice<T: Pod>(&mut self, data: &[T]) {
        self.set_data(bytemuck::cast_slice(data));
    }

    /// Grows the buffer by `bytes.len()` and copies `bytes` to the tail.
    pub fn append_data(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.dirty = true;
    }

    pub fn append_slice<T: Pod>(&mut self, data: &[T]) {
        self.append_data(bytemuck::cast_slice(data));
    }

    /// Resizes to exactly `size` bytes. The common prefix is preserved and
    /// new bytes are zero.
    pub fn resize(&mut self, size: usize) {
        self.data.resize(size, 0);
        self.data.shrink_to_fit();
        self.dirty = true;
    }

    /// Overwrites part of the buffer in place. `offset + bytes.len()` must
    /// not exceed [`size`](Self::size).
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.dirty = true;
    }

    // === GPU synchronization ===

    /// Uploads pending CPU changes and returns the GPU handle.
    ///
    /// The GPU buffer is created on first use and recreated when the CPU
    /// size changed; the previous one is released through the context's
    /// queue. Returns `None` for an empty buffer.
    pub fn sync<D: GpuDevice>(&mut self, ctx: &mut GpuContext<D>) -> Option<ResourceId> {
        if !self.dirty {
            return self.gpu.as_ref().map(GpuResource::id);
        }
        self.dirty = false;

        if self.data.is_empty() {
            self.gpu = None;
            return None;
        }

        let size = self.data.len() as u64;
        let needs_alloc = self.gpu.as_ref().is_none_or(|gpu| gpu.size() != size);
        if needs_alloc {
            if self.gpu.is_some() {
                log::debug!("Reallocating buffer '{}' to {} bytes", self.label, size);
            }
            self.gpu = Some(ctx.create_buffer(&BufferDescriptor {
                label: &self.label,
                usage: self.usage,
                size,
            }));
        }

        let gpu = self.gpu.as_ref()?;
        ctx.write_buffer(gpu, 0, &self.data);
        Some(gpu.id())
    }
}

impl Clone for Buffer {
    /// Copies the CPU bytes. The clone gets its own GPU mirror on its next sync.
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            usage: self.usage,
            data: self.data.clone(),
            dirty: !self.data.is_empty(),
            gpu: None,
        }
    }
}

// ============================================================================
// Shared handle
// ============================================================================

/// Shared ownership of a [`Buffer`]; the buffer lives as long as its
/// longest holder. Equality and hashing are by identity.
#[derive(Debug, Clone)]
pub struct BufferRef(Arc<RwLock<Buffer>>);

impl BufferRef {
    pub fn new(buffer: Buffer) -> Self {
        Self(Arc::new(RwLock::new(buffer)))
    }

    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, Buffer> {
        self.0.read()
    }

    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, Buffer> {
        self.0.write()
    }

    /// Shorthand for `write().sync(ctx)`.
    pub fn sync<D: GpuDevice>(&self, ctx: &mut GpuContext<D>) -> Option<ResourceId> {
        self.0.write().sync(ctx)
    }

    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Buffer> for BufferRef {
    fn from(buffer: Buffer) -> Self {
        Self::new(buffer)
    }
}

impl PartialEq for BufferRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for BufferRef {}

impl std::hash::Hash for BufferRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

// ============================================================================
// Views
// ============================================================================

/// Typed window `(offset, size, format)` into a buffer. Never owns the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferView {
    pub offset: usize,
    pub size: usize,
    pub format: Format,
}

impl BufferView {
    #[must_use]
    pub const fn new(offset: usize, size: usize, format: Format) -> Self {
        Self {
            offset,
            size,
            format,
        }
    }

    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.format.stride()
    }

    /// Number of whole elements in the view.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.size / self.format.stride()
    }

    #[inline]
    #[must_use]
    pub const fn byte_range(&self) -> Range<usize> {
        self.offset..self.offset + self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_preserves_prefix_and_zero_fills() {
        let mut buffer = Buffer::from_bytes(&[1, 2, 3, 4], BufferUsage::Vertex, "test");
        buffer.resize(6);
        assert_eq!(buffer.data(), &[1, 2, 3, 4, 0, 0]);
        buffer.resize(2);
        assert_eq!(buffer.data(), &[1, 2]);
        assert!(buffer.is_dirty());
    }

    #[test]
    fn clone_copies_bytes_not_gpu_state() {
        let buffer = Buffer::from_slice(&[1.0f32, 2.0], BufferUsage::Vertex, "src");
        let copy = buffer.clone();
        assert_eq!(copy.data(), buffer.data());
        assert!(copy.is_dirty());
        assert!(copy.gpu_resource().is_none());
    }

    #[test]
    fn view_count_and_range() {
        let view = BufferView::new(12, 36, Format::VEC3);
        assert_eq!(view.stride(), 12);
        assert_eq!(view.count(), 3);
        assert_eq!(view.byte_range(), 12..48);
    }
}
