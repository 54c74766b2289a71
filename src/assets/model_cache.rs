//! Model Cache
//!
//! Load-or-get access to models by path, plus the procedural shapes every
//! scene tends to need. Both return [`ModelRef`]s; repeated requests hand out
//! the same instance.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::assets::loaders::gltf::load_gltf;
use crate::assets::texture_cache::TextureCache;
use crate::errors::{KilnError, Result};
use crate::renderer::context::GpuContext;
use crate::renderer::device::GpuDevice;
use crate::renderer::shader::Shader;
use crate::resources::material::Material;
use crate::resources::model::{Mesh, MeshData, Model, ModelRef};
use crate::resources::primitives::{SphereOptions, create_cube, create_quad, create_sphere};
use crate::settings::PrimitiveSettings;

/// Built-in procedural shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelShape {
    Cube,
    Sphere,
    Quad,
}

impl ModelShape {
    pub const ALL: [Self; 3] = [Self::Cube, Self::Sphere, Self::Quad];

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

pub struct ModelCache {
    models: FxHashMap<PathBuf, ModelRef>,
    shapes: [ModelRef; 3],
    default_shader: Arc<Shader>,
}

impl ModelCache {
    /// Builds the procedural shapes. Their material 0 is drawn with `default_shader`.
    #[must_use]
    pub fn new(default_shader: Arc<Shader>, settings: &PrimitiveSettings) -> Self {
        let shape = |name: &str, data: MeshData| -> ModelRef {
            let mut model = Model::new(name);
            model.add_mesh(Mesh::from_data(name, &data, Mat4::IDENTITY));
            model.set_material(0, Material::default(), Arc::clone(&default_shader));
            Arc::new(model)
        };

        let shapes = [
            shape("cube", create_cube(settings.cube_size)),
            shape(
                "sphere",
                create_sphere(SphereOptions {
                    radius: settings.sphere_radius,
                    width_segments: settings.sphere_width_segments,
                    height_segments: settings.sphere_height_segments,
                }),
            ),
            shape("quad", create_quad(settings.quad_size)),
        ];

        Self {
            models: FxHashMap::default(),
            shapes,
            default_shader,
        }
    }

    #[must_use]
    pub fn default_shader(&self) -> &Arc<Shader> {
        &self.default_shader
    }

    /// Number of file-backed models currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Returns the cached model for `path`, loading it on first request.
    pub fn load_model<D: GpuDevice>(
        &mut self,
        ctx: &mut GpuContext<D>,
        textures: &mut TextureCache,
        path: impl AsRef<Path>,
    ) -> Result<ModelRef> {
        let path = path.as_ref();
        if let Some(model) = self.models.get(path) {
            log::debug!("Model cache hit: {}", path.display());
            return Ok(Arc::clone(model));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let model = match extension.as_deref() {
            Some("gltf" | "glb") => load_gltf(ctx, textures, path, &self.default_shader),
            _ => Err(KilnError::UnsupportedModelFormat(path.to_path_buf())),
        }
        .inspect_err(|e| log::error!("Failed to load model {}: {e}", path.display()))?;

        let model = Arc::new(model);
        self.models.insert(path.to_path_buf(), Arc::clone(&model));
        Ok(model)
    }

    /// Shared instance of a procedural shape.
    #[must_use]
    pub fn get_model_shape(&self, shape: ModelShape) -> ModelRef {
        Arc::clone(&self.shapes[shape.index()])
    }
}
