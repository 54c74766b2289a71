//! glTF 2.0 Loader
//!
//! Converts a `.gltf` / `.glb` file into a [`Model`]:
//!
//! - Every glTF mesh becomes one vertex + index buffer pair. Each of its
//!   primitives becomes a [`SubMesh`](crate::resources::model::SubMesh)
//!   range in that index buffer.
//! - Node transforms are accumulated down the hierarchy into each mesh's
//!   matrix. A glTF mesh referenced by several nodes shares its buffers.
//! - Missing normals default to +Y, missing texture coordinates to zero and
//!   missing indices to a sequential list.
//! - Material textures go through the texture cache with the model sampler.

use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use rustc_hash::FxHashMap;

use crate::assets::texture_cache::TextureCache;
use crate::errors::Result;
use crate::renderer::context::GpuContext;
use crate::renderer::device::GpuDevice;
use crate::renderer::shader::Shader;
use crate::resources::format::Format;
use crate::resources::material::Material;
use crate::resources::model::{Mesh, MeshData, Model, Vertex};
use crate::resources::texture::TextureHandle;

/// Per-load state.
struct GltfLoader<'a, D: GpuDevice> {
    ctx: &'a mut GpuContext<D>,
    textures: &'a mut TextureCache,
    label: String,
    buffers: Vec<gltf::buffer::Data>,
    images: Vec<gltf::image::Data>,
    /// glTF image index → uploaded texture.
    image_textures: FxHashMap<usize, TextureHandle>,
    /// glTF mesh index → first instance, reused for later nodes.
    meshes: FxHashMap<usize, Mesh>,
    /// Material indices referenced by at least one primitive.
    used_materials: Vec<usize>,
}

/// Loads a glTF file. Every material is drawn with `shader`.
pub fn load_gltf<D: GpuDevice>(
    ctx: &mut GpuContext<D>,
    textures: &mut TextureCache,
    path: &Path,
    shader: &Arc<Shader>,
) -> Result<Model> {
    let (document, buffers, images) = gltf::import(path)?;
    let label = path
        .file_stem()
        .map_or_else(|| "model".to_string(), |s| s.to_string_lossy().into_owned());

    let mut loader = GltfLoader {
        ctx,
        textures,
        label: label.clone(),
        buffers,
        images,
        image_textures: FxHashMap::default(),
        meshes: FxHashMap::default(),
        used_materials: Vec::new(),
    };

    let mut model = Model::new(label);
    let default_material = document.materials().len();

    let scene = document.default_scene().or_else(|| document.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                loader.visit_node(&node, Mat4::IDENTITY, default_material, &mut model);
            }
        }
        None => {
            // No scene: place every mesh once at the origin.
            for mesh in document.meshes() {
                let mesh = loader.mesh(&mesh, Mat4::IDENTITY, default_material);
                model.add_mesh(mesh);
            }
        }
    }

    let gltf_materials: Vec<gltf::Material<'_>> = document.materials().collect();
    let mut used = std::mem::take(&mut loader.used_materials);
    used.sort_unstable();
    used.dedup();
    for index in used {
        let material = match gltf_materials.get(index) {
            Some(source) => loader.material(source),
            None => Material::default(),
        };
        model.set_material(index, material, Arc::clone(shader));
    }

    log::debug!(
        "Loaded glTF {} ({} meshes, {} materials)",
        path.display(),
        model.meshes().len(),
        model.material_count()
    );
    Ok(model)
}

impl<D: GpuDevice> GltfLoader<'_, D> {
    fn visit_node(&mut self, node: &gltf::Node<'_>, parent: Mat4, default_material: usize, model: &mut Model) {
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            let mesh = self.mesh(&mesh, world, default_material);
            model.add_mesh(mesh);
        }
        for child in node.children() {
            self.visit_node(&child, world, default_material, model);
        }
    }

    fn mesh(&mut self, mesh: &gltf::Mesh<'_>, matrix: Mat4, default_material: usize) -> Mesh {
        if let Some(existing) = self.meshes.get(&mesh.index()) {
            return existing.instanced(matrix);
        }

        let mut data = MeshData::default();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "{}: skipping {:?} primitive of mesh {}",
                    self.label,
                    primitive.mode(),
                    mesh.index()
                );
                continue;
            }

            let reader = primitive.reader(|b| self.buffers.get(b.index()).map(|d| d.0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                log::warn!("{}: primitive without positions in mesh {}", self.label, mesh.index());
                continue;
            };

            let mut vertices: Vec<Vertex> = positions
                .map(|p| Vertex {
                    position: Vec3::from_array(p),
                    ..Default::default()
                })
                .collect();
            if let Some(normals) = reader.read_normals() {
                for (vertex, n) in vertices.iter_mut().zip(normals) {
                    vertex.normal = Vec3::from_array(n);
                }
            }
            if let Some(tex_coords) = reader.read_tex_coords(0) {
                for (vertex, uv) in vertices.iter_mut().zip(tex_coords.into_f32()) {
                    vertex.tex_coord = Vec2::from_array(uv);
                }
            }
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };

            let material = primitive.material().index().unwrap_or(default_material);
            self.used_materials.push(material);
            data.push_primitive(&vertices, &indices, material);
        }

        let name = mesh.name().map_or_else(
            || format!("{}#{}", self.label, mesh.index()),
            |n| format!("{}/{n}", self.label),
        );
        let built = Mesh::from_data(&name, &data, matrix);
        self.meshes.insert(mesh.index(), built.clone());
        built
    }

    fn material(&mut self, source: &gltf::Material<'_>) -> Material {
        let pbr = source.pbr_metallic_roughness();
        let [r, g, b, _] = pbr.base_color_factor();

        Material {
            name: source.name().map(str::to_string),
            color: Vec3::new(r, g, b),
            roughness: pbr.roughness_factor(),
            metallic: pbr.metallic_factor(),
            ao: source.occlusion_texture().map_or(1.0, |t| t.strength()),
            albedo_map: pbr.base_color_texture().and_then(|t| self.texture(&t.texture())),
            normal_map: source.normal_texture().and_then(|t| self.texture(&t.texture())),
            specular_map: pbr
                .metallic_roughness_texture()
                .and_then(|t| self.texture(&t.texture())),
            emissive_map: source.emissive_texture().and_then(|t| self.texture(&t.texture())),
            occlusion_map: source.occlusion_texture().and_then(|t| self.texture(&t.texture())),
        }
    }

    fn texture(&mut self, texture: &gltf::Texture<'_>) -> Option<TextureHandle> {
        let index = texture.source().index();
        if let Some(&handle) = self.image_textures.get(&index) {
            return Some(handle);
        }

        let Some(image) = self.images.get(index) else {
            log::warn!("{}: texture references missing image {index}", self.label);
            return None;
        };
        let format = image_format(image.format);
        let name = format!("{}#image{index}", self.label);
        let sampler = self.textures.settings().model_sampler;
        let handle = self.textures.create_texture_with_sampler(
            self.ctx,
            Some(&name),
            image.width,
            image.height,
            format,
            &image.pixels,
            sampler,
        );
        self.image_textures.insert(index, handle);
        Some(handle)
    }
}

fn image_format(format: gltf::image::Format) -> Format {
    use crate::resources::format::{Dimension, ElementType};
    use gltf::image::Format as F;

    match format {
        F::R8 => Format::from_components_and_bits(1, 8),
        F::R8G8 => Format::from_components_and_bits(2, 8),
        F::R8G8B8 => Format::from_components_and_bits(3, 8),
        F::R8G8B8A8 => Format::from_components_and_bits(4, 8),
        F::R16 => Format::from_components_and_bits(1, 16),
        F::R16G16 => Format::from_components_and_bits(2, 16),
        F::R16G16B16 => Format::from_components_and_bits(3, 16),
        F::R16G16B16A16 => Format::from_components_and_bits(4, 16),
        F::R32G32B32FLOAT => Format::new(ElementType::Float32, Dimension::Vec3),
        F::R32G32B32A32FLOAT => Format::new(ElementType::Float32, Dimension::Vec4),
    }
}
