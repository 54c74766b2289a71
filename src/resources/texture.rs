//! Textures
//!
//! A [`Texture`] is a GPU image owned by a
//! [`TextureCache`](crate::assets::texture_cache::TextureCache). Consumers hold
//! a [`TextureHandle`], a dense index that stays valid for the lifetime of the
//! cache that issued it.

use serde::{Deserialize, Serialize};

use crate::renderer::context::GpuResource;
use crate::renderer::device::ResourceId;
use crate::resources::format::Format;

/// Image dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureKind {
    #[default]
    Tex2D,
    /// Six square faces in +X, -X, +Y, -Y, +Z, -Z order.
    TexCube,
}

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

/// Texel filtering, used for magnification, minification and mip selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Sampling policy attached to a texture at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureSampler {
    pub wrap: WrapMode,
    pub filter: FilterMode,
}

impl Default for TextureSampler {
    fn default() -> Self {
        Self::clamp_linear()
    }
}

impl TextureSampler {
    /// Clamp-to-edge with linear filtering. Used by the texture cache.
    #[must_use]
    pub const fn clamp_linear() -> Self {
        Self {
            wrap: WrapMode::ClampToEdge,
            filter: FilterMode::Linear,
        }
    }

    /// Repeat with linear filtering. Used for model material textures.
    #[must_use]
    pub const fn repeat_linear() -> Self {
        Self {
            wrap: WrapMode::Repeat,
            filter: FilterMode::Linear,
        }
    }
}

/// Stable index into a texture cache's storage. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u32);

impl TextureHandle {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// GPU image plus the metadata it was created with.
#[derive(Debug)]
pub struct Texture {
    pub(crate) gpu: GpuResource,
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub kind: TextureKind,
    pub format: Format,
    pub sampler: TextureSampler,
}

impl Texture {
    /// Device handle of the image.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.gpu.id()
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
