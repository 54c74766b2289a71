//! Materials
//!
//! A [`Material`] is the per-draw surface description a model pairs with a
//! [`Shader`]. Scalar properties are written into the shader's uniform block
//! by [`Material::apply`]; texture maps are handles into the texture cache
//! that loaded them.

use glam::Vec3;

use crate::renderer::shader::Shader;
use crate::resources::texture::TextureHandle;

/// Surface parameters of a PBR-style material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    /// Base color multiplier.
    pub color: Vec3,
    pub roughness: f32,
    pub metallic: f32,
    /// Ambient occlusion factor.
    pub ao: f32,

    pub albedo_map: Option<TextureHandle>,
    pub normal_map: Option<TextureHandle>,
    /// Metallic-roughness (or specular) map.
    pub specular_map: Option<TextureHandle>,
    pub emissive_map: Option<TextureHandle>,
    pub occlusion_map: Option<TextureHandle>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            color: Vec3::ONE,
            roughness: 1.0,
            metallic: 0.0,
            ao: 1.0,
            albedo_map: None,
            normal_map: None,
            specular_map: None,
            emissive_map: None,
            occlusion_map: None,
        }
    }
}

impl Material {
    #[must_use]
    pub fn with_color(color: Vec3) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    /// Writes the scalar properties into `shader`'s uniform block.
    ///
    /// Members the shader does not declare are skipped. `has_albedo_map` is
    /// left to whoever binds the texture.
    pub fn apply(&self, shader: &Shader) {
        shader.set_uniform_vec3("color", self.color);
        shader.set_uniform_1f("roughness", self.roughness);
        shader.set_uniform_1f("metallic", self.metallic);
        shader.set_uniform_1f("ao", self.ao);
    }
}
