//! Kiln
//!
//! The GPU resource and rendering-state layer of a small real-time engine.
//!
//! - [`resources`]: CPU-side data (formats, buffers, textures, meshes, models)
//! - [`renderer`]: device abstraction, shaders and per-frame command recording
//! - [`assets`]: decoders and load-or-get caches for textures and models
//!
//! GPU work goes through a [`renderer::GpuContext`], which owns a
//! [`renderer::GpuDevice`] implementation: [`renderer::WgpuDevice`] for real
//! hardware or [`renderer::HeadlessDevice`] for tooling and tests.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod resources;
pub mod assets;
pub mod renderer;
pub mod errors;
pub mod settings;

pub use resources::{Buffer, BufferRef, BufferUsage, BufferView, Format, Material, Mesh, Model, ModelRef, Texture, TextureHandle};
pub use resources::primitives::*;
pub use assets::{ModelCache, ModelShape, TextureCache};
pub use renderer::{Backend, FrameStats, GpuContext, GpuDevice, HeadlessDevice, Shader, WgpuDevice};
pub use errors::{KilnError, Result};
pub use settings::Settings;
