//! Procedural shapes shared by the model cache.

pub mod cube;
pub mod quad;
pub mod sphere;

pub use cube::create_cube;
pub use quad::create_quad;
pub use sphere::{SphereOptions, create_sphere};
