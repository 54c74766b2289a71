//! Engine Settings
//!
//! Configuration for the resource layer and the GPU device, loadable from a
//! JSON file. Every field has a default, so a settings file only needs to
//! mention what it overrides:
//!
//! ```json
//! {
//!     "shaders": { "include_dir": "resources/shaders" },
//!     "textures": { "cache_sampler": { "wrap": "Repeat", "filter": "Nearest" } },
//!     "device": { "target_width": 1920, "target_height": 1080 }
//! }
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use kiln::settings::Settings;
//!
//! let settings = Settings::from_json_file("kiln.json")?;
//! let settings = Settings {
//!     device: DeviceSettings { target_width: 640, target_height: 480, ..Default::default() },
//!     ..Default::default()
//! };
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::resources::texture::TextureSampler;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub shaders: ShaderSettings,
    pub textures: TextureSettings,
    pub primitives: PrimitiveSettings,
    pub device: DeviceSettings,
}

impl Settings {
    /// Parses settings from a JSON string. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON settings file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&text)?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}

// ---------------------------------------------------------------------------
// Shaders
// ---------------------------------------------------------------------------

/// Shader source handling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderSettings {
    /// Directory searched for `#include` targets.
    ///
    /// When `None`, includes resolve relative to the including file.
    pub include_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Textures
// ---------------------------------------------------------------------------

/// Texture cache behaviour.
///
/// Two sampler policies coexist: textures created through the cache
/// directly use [`cache_sampler`](Self::cache_sampler), while textures
/// referenced by model materials use [`model_sampler`](Self::model_sampler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    /// Sampler for `load_texture` / `create_texture`. Clamp-to-edge + linear.
    pub cache_sampler: TextureSampler,
    /// Sampler for textures referenced by model materials. Repeat + linear.
    pub model_sampler: TextureSampler,
    /// Storage reserved up front in the texture cache.
    pub initial_capacity: usize,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            cache_sampler: TextureSampler::clamp_linear(),
            model_sampler: TextureSampler::repeat_linear(),
            initial_capacity: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Dimensions of the procedural shapes built by the model cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimitiveSettings {
    /// Edge length of the cube.
    pub cube_size: f32,
    /// Side length of the quad.
    pub quad_size: f32,
    pub sphere_radius: f32,
    /// Longitude subdivisions.
    pub sphere_width_segments: u32,
    /// Latitude subdivisions.
    pub sphere_height_segments: u32,
}

impl Default for PrimitiveSettings {
    fn default() -> Self {
        Self {
            cube_size: 2.0,
            quad_size: 2.0,
            sphere_radius: 1.0,
            sphere_width_segments: 64,
            sphere_height_segments: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// Options for [`WgpuDevice`](crate::renderer::wgpu_device::WgpuDevice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Width of the offscreen color target.
    pub target_width: u32,
    /// Height of the offscreen color target.
    pub target_height: u32,
    /// Linear RGBA clear color.
    pub clear_color: [f64; 4],
    /// Prefer a discrete adapter over an integrated one.
    pub high_performance: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            target_width: 1280,
            target_height: 720,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            high_performance: true,
        }
    }
}

impl DeviceSettings {
    #[must_use]
    pub fn power_preference(&self) -> wgpu::PowerPreference {
        if self.high_performance {
            wgpu::PowerPreference::HighPerformance
        } else {
            wgpu::PowerPreference::LowPower
        }
    }

    #[must_use]
    pub fn wgpu_clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }
}
