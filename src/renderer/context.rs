//! GPU Context
//!
//! The [`GpuContext`] owns the active [`GpuDevice`] and the release queue.
//! It is created once per rendering-context lifetime and passed by reference
//! to every component that talks to the GPU.
//!
//! Device objects handed out by the context are wrapped in [`GpuResource`],
//! an owning handle that enqueues its release when dropped. The queue is
//! drained by [`Backend::end_frame`](super::backend::Backend::end_frame)
//! after the frame's commands were submitted, so a resource dropped
//! mid-frame stays alive until the GPU is done with it.

use std::fmt;

use crate::errors::Result;
use crate::renderer::device::{
    BufferDescriptor, DrawCommand, GpuDevice, RawResource, ResourceId, ResourceKind,
    TextureDescriptor,
};
use crate::renderer::shader_compiler::CompiledProgram;

/// Owning handle to a device object.
///
/// Not `Clone`: exactly one owner per device object. Dropping it schedules
/// the object for destruction at the next frame boundary.
pub struct GpuResource {
    raw: RawResource,
    size: u64,
    release: flume::Sender<RawResource>,
}

impl GpuResource {
    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.raw.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.raw.kind
    }

    #[inline]
    #[must_use]
    pub fn raw(&self) -> RawResource {
        self.raw
    }

    /// Allocated size in bytes (buffers only; 0 otherwise).
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for GpuResource {
    fn drop(&mut self) {
        // The receiver is gone once the context is dropped; the device went with it.
        let _ = self.release.send(self.raw);
    }
}

impl fmt::Debug for GpuResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuResource")
            .field("id", &self.raw.id)
            .field("kind", &self.raw.kind)
            .field("size", &self.size)
            .finish()
    }
}

/// Explicit rendering context: the device plus the release queue.
pub struct GpuContext<D: GpuDevice> {
    device: D,
    release_tx: flume::Sender<RawResource>,
    release_rx: flume::Receiver<RawResource>,
}

impl<D: GpuDevice> GpuContext<D> {
    pub fn new(device: D) -> Self {
        let (release_tx, release_rx) = flume::unbounded();
        Self {
            device,
            release_tx,
            release_rx,
        }
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Consumes the context, destroying everything still queued.
    pub fn into_device(mut self) -> D {
        self.drain_releases();
        let Self { device, .. } = self;
        device
    }

    fn wrap(&self, id: ResourceId, kind: ResourceKind, size: u64) -> GpuResource {
        GpuResource {
            raw: RawResource { id, kind },
            size,
            release: self.release_tx.clone(),
        }
    }

    pub fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> GpuResource {
        let id = self.device.create_buffer(desc);
        log::trace!("Created buffer '{}' ({} bytes)", desc.label, desc.size);
        self.wrap(id, desc.usage.into(), desc.size)
    }

    pub fn write_buffer(&mut self, buffer: &GpuResource, offset: u64, data: &[u8]) {
        debug_assert!(offset + data.len() as u64 <= buffer.size());
        self.device.write_buffer(buffer.id(), offset, data);
    }

    pub fn create_texture(&mut self, desc: &TextureDescriptor<'_>, layers: &[&[u8]]) -> GpuResource {
        assert_eq!(
            layers.len(),
            desc.layer_count() as usize,
            "texture '{}' expects {} layers",
            desc.label,
            desc.layer_count()
        );
        let id = self.device.create_texture(desc, layers);
        self.wrap(id, ResourceKind::Texture, 0)
    }

    pub fn create_program(&mut self, program: &CompiledProgram) -> Result<GpuResource> {
        let id = self.device.create_program(program)?;
        Ok(self.wrap(id, ResourceKind::Program, 0))
    }

    /// Queues a raw device object for destruction at the next frame boundary.
    pub fn release(&self, resource: RawResource) {
        let _ = self.release_tx.send(resource);
    }

    /// Number of objects waiting for destruction.
    #[must_use]
    pub fn pending_releases(&self) -> usize {
        self.release_rx.len()
    }

    pub(crate) fn submit(&mut self, commands: &[DrawCommand]) {
        self.device.submit(commands);
    }

    /// Destroys everything queued so far. Returns how many objects were freed.
    pub(crate) fn drain_releases(&mut self) -> usize {
        let mut count = 0;
        for resource in self.release_rx.try_iter() {
            self.device.destroy(resource);
            count += 1;
        }
        if count > 0 {
            log::debug!("Released {count} GPU resources");
        }
        count
    }
}
