use glam::{Vec2, Vec3};

use crate::resources::model::{MeshData, Vertex};

/// Square in the XY plane facing +Z, centered on the origin.
#[must_use]
pub fn create_quad(size: f32) -> MeshData {
    let h = size / 2.0;
    let vertices = vec![
        Vertex::new(Vec3::new(-h, -h, 0.0), Vec3::Z, Vec2::new(0.0, 1.0)),
        Vertex::new(Vec3::new(h, -h, 0.0), Vec3::Z, Vec2::new(1.0, 1.0)),
        Vertex::new(Vec3::new(h, h, 0.0), Vec3::Z, Vec2::new(1.0, 0.0)),
        Vertex::new(Vec3::new(-h, h, 0.0), Vec3::Z, Vec2::new(0.0, 0.0)),
    ];
    MeshData::single(vertices, vec![0, 1, 2, 0, 2, 3])
}
