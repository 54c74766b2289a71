//! Meshes and Models
//!
//! - [`MeshData`]: CPU geometry (vertices, indices, draw ranges) as produced
//!   by the primitive generators and the glTF loader.
//! - [`Mesh`]: the GPU-facing form. One vertex buffer and one index buffer,
//!   a `slot → view` layout, the active attributes and a local transform.
//! - [`Model`]: ordered meshes plus the `material index → (material, shader)`
//!   table they share.
//!
//! Vertex buffers use a sequential layout: all positions, then all normals,
//! then all texture coordinates.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use rustc_hash::FxHashMap;

use crate::renderer::shader::Shader;
use crate::resources::buffer::{Buffer, BufferRef, BufferUsage, BufferView};
use crate::resources::format::Format;
use crate::resources::material::Material;

// ============================================================================
// Vertex layout
// ============================================================================

/// Vertex input slot. The discriminant is the shader input location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Position = 0,
    Normal = 1,
    TexCoord = 2,
    Tangent = 3,
    Color = 4,
}

impl Slot {
    #[inline]
    #[must_use]
    pub const fn location(self) -> u32 {
        self as u32
    }
}

/// An active vertex input: which slot, read with which format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub slot: Slot,
    pub format: Format,
}

impl Attribute {
    #[must_use]
    pub const fn new(slot: Slot, format: Format) -> Self {
        Self { slot, format }
    }
}

/// Draw range inside a mesh's index buffer using one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubMesh {
    /// First index.
    pub start: u32,
    /// Number of indices.
    pub count: u32,
    pub material: usize,
}

impl SubMesh {
    #[inline]
    #[must_use]
    pub fn range(&self) -> std::ops::Range<u32> {
        self.start..self.start + self.count
    }
}

// ============================================================================
// CPU geometry
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            tex_coord: Vec2::ZERO,
        }
    }
}

impl Vertex {
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// Indexed triangle list with draw ranges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub sub_meshes: Vec<SubMesh>,
}

impl MeshData {
    /// Appends another triangle list as a new sub-mesh drawn with `material`.
    pub fn push_primitive(&mut self, vertices: &[Vertex], indices: &[u32], material: usize) {
        let base = self.vertices.len() as u32;
        let start = self.indices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.indices.extend(indices.iter().map(|i| i + base));
        self.sub_meshes.push(SubMesh {
            start,
            count: indices.len() as u32,
            material,
        });
    }

    /// Geometry drawn as a single sub-mesh with material 0.
    #[must_use]
    pub fn single(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let count = indices.len() as u32;
        Self {
            vertices,
            indices,
            sub_meshes: vec![SubMesh {
                start: 0,
                count,
                material: 0,
            }],
        }
    }
}

// ============================================================================
// Mesh
// ============================================================================

#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertex_buffer: BufferRef,
    pub index_buffer: BufferRef,
    /// `UInt16` or `UInt32` scalar.
    pub index_format: Format,
    pub views: FxHashMap<Slot, BufferView>,
    pub attributes: Vec<Attribute>,
    pub sub_meshes: Vec<SubMesh>,
    pub matrix: Mat4,
}

impl Mesh {
    /// Uploads-to-be buffers for `data` in sequential layout.
    ///
    /// Indices are stored as `u16` when every vertex is addressable with 16
    /// bits, `u32` otherwise.
    #[must_use]
    pub fn from_data(label: &str, data: &MeshData, matrix: Mat4) -> Self {
        let count = data.vertices.len();
        let positions: Vec<Vec3> = data.vertices.iter().map(|v| v.position).collect();
        let normals: Vec<Vec3> = data.vertices.iter().map(|v| v.normal).collect();
        let tex_coords: Vec<Vec2> = data.vertices.iter().map(|v| v.tex_coord).collect();

        let mut vertex_buffer = Buffer::new(BufferUsage::Vertex, format!("{label} vertices"));
        let mut views = FxHashMap::default();
        let mut attributes = Vec::with_capacity(3);

        for (slot, format, bytes) in [
            (Slot::Position, Format::VEC3, bytemuck::cast_slice::<Vec3, u8>(&positions)),
            (Slot::Normal, Format::VEC3, bytemuck::cast_slice(&normals)),
            (Slot::TexCoord, Format::VEC2, bytemuck::cast_slice(&tex_coords)),
        ] {
            debug_assert_eq!(bytes.len(), count * format.stride());
            views.insert(slot, BufferView::new(vertex_buffer.size(), bytes.len(), format));
            attributes.push(Attribute::new(slot, format));
            vertex_buffer.append_data(bytes);
        }

        let (index_buffer, index_format) = if count <= usize::from(u16::MAX) + 1 {
            let short: Vec<u16> = data.indices.iter().map(|&i| i as u16).collect();
            (
                Buffer::from_slice(&short, BufferUsage::Index, format!("{label} indices")),
                Format::INDEX_U16,
            )
        } else {
            (
                Buffer::from_slice(&data.indices, BufferUsage::Index, format!("{label} indices")),
                Format::INDEX_U32,
            )
        };

        Self {
            vertex_buffer: vertex_buffer.into(),
            index_buffer: index_buffer.into(),
            index_format,
            views,
            attributes,
            sub_meshes: data.sub_meshes.clone(),
            matrix,
        }
    }

    /// Another placement of the same geometry. Buffers are shared.
    #[must_use]
    pub fn instanced(&self, matrix: Mat4) -> Self {
        Self {
            matrix,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.views
            .get(&Slot::Position)
            .map_or(0, BufferView::count)
    }

    #[must_use]
    pub fn index_count(&self) -> usize {
        self.index_buffer.read().size() / self.index_format.stride()
    }
}

// ============================================================================
// Model
// ============================================================================

/// Material plus the program that draws it.
#[derive(Debug, Clone)]
pub struct MaterialBinding {
    pub material: Material,
    pub shader: Arc<Shader>,
}

#[derive(Debug, Default)]
pub struct Model {
    pub name: String,
    meshes: Vec<Mesh>,
    materials: FxHashMap<usize, MaterialBinding>,
}

/// Shared model handle. Caches keep a second reference for deduplication.
pub type ModelRef = Arc<Model>;

impl Model {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
    }

    pub fn set_material(&mut self, index: usize, material: Material, shader: Arc<Shader>) {
        self.materials.insert(index, MaterialBinding { material, shader });
    }

    #[inline]
    #[must_use]
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    #[must_use]
    pub fn material(&self, index: usize) -> Option<&MaterialBinding> {
        self.materials.get(&index)
    }

    #[must_use]
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> (Vec<Vertex>, Vec<u32>) {
        let vertices = vec![
            Vertex::new(Vec3::ZERO, Vec3::Z, Vec2::ZERO),
            Vertex::new(Vec3::X, Vec3::Z, Vec2::X),
            Vertex::new(Vec3::Y, Vec3::Z, Vec2::Y),
        ];
        (vertices, vec![0, 1, 2])
    }

    #[test]
    fn push_primitive_offsets_indices_and_ranges() {
        let (vertices, indices) = triangle();
        let mut data = MeshData::default();
        data.push_primitive(&vertices, &indices, 0);
        data.push_primitive(&vertices, &indices, 3);

        assert_eq!(data.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(data.sub_meshes[1], SubMesh { start: 3, count: 3, material: 3 });
    }

    #[test]
    fn sequential_layout() {
        let (vertices, indices) = triangle();
        let mesh = Mesh::from_data("tri", &MeshData::single(vertices, indices), Mat4::IDENTITY);

        assert_eq!(mesh.views[&Slot::Position], BufferView::new(0, 36, Format::VEC3));
        assert_eq!(mesh.views[&Slot::Normal], BufferView::new(36, 36, Format::VEC3));
        assert_eq!(mesh.views[&Slot::TexCoord], BufferView::new(72, 24, Format::VEC2));
        assert_eq!(mesh.vertex_buffer.read().size(), 96);
        assert_eq!(mesh.index_format, Format::INDEX_U16);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn default_vertex_normal_points_up() {
        assert_eq!(Vertex::default().normal, Vec3::Y);
    }

    fn mesh_with_vertices(count: usize) -> Mesh {
        let last = count as u32 - 1;
        let data = MeshData::single(vec![Vertex::default(); count], vec![0, last / 2, last]);
        Mesh::from_data("large", &data, Mat4::IDENTITY)
    }

    #[test]
    fn short_indices_up_to_65536_vertices() {
        let mesh = mesh_with_vertices(65_536);
        assert_eq!(mesh.index_format, Format::INDEX_U16);

        let bytes = mesh.index_buffer.read().data().to_vec();
        let indices: Vec<u16> = bytemuck::pod_collect_to_vec(&bytes);
        assert_eq!(indices, vec![0, 32_767, 65_535]);
    }

    #[test]
    fn wide_indices_above_65536_vertices() {
        let mesh = mesh_with_vertices(65_537);
        assert_eq!(mesh.index_format, Format::INDEX_U32);

        let bytes = mesh.index_buffer.read().data().to_vec();
        let indices: Vec<u32> = bytemuck::pod_collect_to_vec(&bytes);
        assert_eq!(indices, vec![0, 32_768, 65_536]);
        assert_eq!(mesh.index_count(), 3);
    }
}
