//! CPU-side resource definitions.
//!
//! None of these types talk to the GPU directly; buffers and textures hold a
//! [`GpuResource`](crate::renderer::GpuResource) once uploaded.

pub mod buffer;
pub mod format;
pub mod material;
pub mod model;
pub mod primitives;
pub mod texture;

pub use buffer::{Buffer, BufferRef, BufferUsage, BufferView};
pub use format::{Dimension, ElementType, Format};
pub use material::Material;
pub use model::{Attribute, MaterialBinding, Mesh, MeshData, Model, ModelRef, Slot, SubMesh, Vertex};
pub use texture::{FilterMode, Texture, TextureHandle, TextureKind, TextureSampler, WrapMode};
