use glam::{Vec2, Vec3};

use crate::resources::model::{MeshData, Vertex};

/// Outward normal and in-plane axes (u, v) of each face.
const FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
];

/// Axis-aligned cube centered on the origin.
///
/// 24 vertices (4 per face, so every face has flat normals) and 36 indices
/// wound counter-clockwise.
#[must_use]
pub fn create_cube(size: f32) -> MeshData {
    let half = size / 2.0;
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, (normal, u, v)) in FACES.into_iter().enumerate() {
        let base = (face * 4) as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = (normal + u * su + v * sv) * half;
            let tex_coord = Vec2::new((su + 1.0) / 2.0, (1.0 - sv) / 2.0);
            vertices.push(Vertex::new(position, normal, tex_coord));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData::single(vertices, indices)
}
