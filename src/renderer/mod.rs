//! Device abstraction and frame recording.
//!
//! [`GpuDevice`] is the seam between resource bookkeeping and the graphics
//! API. Everything above it ([`GpuContext`], [`Shader`], [`Backend`]) is
//! device-agnostic.

pub mod backend;
pub mod context;
pub mod device;
pub mod headless;
pub mod mapping;
pub mod shader;
pub mod shader_compiler;
pub mod wgpu_device;

pub use backend::{Backend, FrameStats};
pub use context::{GpuContext, GpuResource};
pub use device::{DrawCommand, GpuDevice, RawResource, ResourceId, ResourceKind};
pub use headless::HeadlessDevice;
pub use shader::Shader;
pub use shader_compiler::{CompiledProgram, Preprocessor, UniformKind, UniformLayout};
pub use wgpu_device::WgpuDevice;
