use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::resources::model::{MeshData, Vertex};

#[derive(Debug, Clone, Copy)]
pub struct SphereOptions {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            width_segments: 64,
            height_segments: 64,
        }
    }
}

/// UV sphere centered on the origin.
#[must_use]
pub fn create_sphere(options: SphereOptions) -> MeshData {
    let radius = options.radius;
    let width_segments = options.width_segments.max(3);
    let height_segments = options.height_segments.max(2);

    let ring = width_segments + 1;
    let mut vertices = Vec::with_capacity((ring * (height_segments + 1)) as usize);
    let mut indices = Vec::with_capacity((width_segments * height_segments * 6) as usize);

    for y in 0..=height_segments {
        let v = y as f32 / height_segments as f32;
        // Latitude, from the south pole (0) to the north pole (PI).
        let theta = v * PI;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for x in 0..=width_segments {
            let u = x as f32 / width_segments as f32;
            let phi = u * 2.0 * PI;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let normal = Vec3::new(-sin_theta * cos_phi, -cos_theta, sin_theta * sin_phi);
            vertices.push(Vertex::new(normal * radius, normal, Vec2::new(u, 1.0 - v)));
        }
    }

    for y in 0..height_segments {
        for x in 0..width_segments {
            let a = y * ring + x;
            let b = a + 1;
            let c = a + ring;
            let d = c + 1;
            indices.extend_from_slice(&[a, b, c, b, d, c]);
        }
    }

    MeshData::single(vertices, indices)
}
