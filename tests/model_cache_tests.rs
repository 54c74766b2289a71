//! Model Cache Tests
//!
//! Tests for:
//! - Procedural shapes: vertex/index counts, shared instances, default shader
//! - load_model: glTF import, node transforms, mesh reuse, material mapping
//! - Deduplication: repeated loads return the same model
//! - Unsupported formats and unreadable files

mod common;

use std::sync::Arc;

use glam::{Mat4, Vec3};

use kiln::assets::{ModelCache, ModelShape, TextureCache};
use kiln::errors::KilnError;
use kiln::resources::format::Format;
use kiln::resources::model::Slot;
use kiln::settings::{PrimitiveSettings, TextureSettings};

use common::{Ctx, basic_shader, headless, temp_dir, write_triangle_gltf};

const EPSILON: f32 = 1e-5;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn setup() -> (Ctx, ModelCache, TextureCache) {
    let mut ctx = headless();
    let shader = basic_shader(&mut ctx);
    let models = ModelCache::new(shader, &PrimitiveSettings::default());
    (ctx, models, TextureCache::new(&TextureSettings::default()))
}

// ============================================================================
// Procedural Shapes
// ============================================================================

#[test]
fn shapes_are_shared_instances() {
    let (_ctx, models, _) = setup();
    for shape in ModelShape::ALL {
        let a = models.get_model_shape(shape);
        let b = models.get_model_shape(shape);
        assert!(Arc::ptr_eq(&a, &b), "{shape:?}");
    }
    assert!(!Arc::ptr_eq(
        &models.get_model_shape(ModelShape::Cube),
        &models.get_model_shape(ModelShape::Quad)
    ));
}

#[test]
fn shape_geometry_counts() {
    let (_ctx, models, _) = setup();

    let cube = models.get_model_shape(ModelShape::Cube);
    assert_eq!(cube.meshes()[0].vertex_count(), 24);
    assert_eq!(cube.meshes()[0].index_count(), 36);

    let quad = models.get_model_shape(ModelShape::Quad);
    assert_eq!(quad.meshes()[0].vertex_count(), 4);
    assert_eq!(quad.meshes()[0].index_count(), 6);

    let sphere = models.get_model_shape(ModelShape::Sphere);
    assert_eq!(sphere.meshes()[0].vertex_count(), 65 * 65);
    assert_eq!(sphere.meshes()[0].index_count(), 64 * 64 * 6);
}

#[test]
fn shapes_use_default_shader() {
    let (_ctx, models, _) = setup();
    let cube = models.get_model_shape(ModelShape::Cube);
    let binding = cube.material(0).unwrap();
    assert!(Arc::ptr_eq(&binding.shader, models.default_shader()));
    assert_eq!(binding.material.color, Vec3::ONE);
}

#[test]
fn shape_index_round_trips() {
    for (i, shape) in ModelShape::ALL.into_iter().enumerate() {
        assert_eq!(shape.index(), i);
        assert_eq!(ModelShape::from_index(i), Some(shape));
    }
    assert_eq!(ModelShape::from_index(3), None);
}

#[test]
fn primitive_settings_scale_shapes() {
    let mut ctx = headless();
    let shader = basic_shader(&mut ctx);
    let settings = PrimitiveSettings {
        cube_size: 4.0,
        sphere_width_segments: 8,
        sphere_height_segments: 4,
        ..Default::default()
    };
    let models = ModelCache::new(shader, &settings);

    let sphere = models.get_model_shape(ModelShape::Sphere);
    assert_eq!(sphere.meshes()[0].vertex_count(), 9 * 5);

    let cube = models.get_model_shape(ModelShape::Cube);
    let mesh = &cube.meshes()[0];
    let view = mesh.views[&Slot::Position];
    let buffer = mesh.vertex_buffer.read();
    let positions: Vec<f32> = bytemuck::pod_collect_to_vec(&buffer.data()[view.byte_range()]);
    let extent = positions.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    assert!((extent - 2.0).abs() < EPSILON);
}

// ============================================================================
// glTF Loading
// ============================================================================

#[test]
fn loads_gltf_with_nodes_and_materials() {
    let dir = temp_dir("gltf");
    let path = write_triangle_gltf(&dir);
    let (mut ctx, mut models, mut textures) = setup();

    let model = models.load_model(&mut ctx, &mut textures, &path).unwrap();
    assert_eq!(model.name, "triangle");
    assert_eq!(model.meshes().len(), 2);

    let first = &model.meshes()[0];
    let second = &model.meshes()[1];
    assert_eq!(first.vertex_count(), 3);
    assert_eq!(first.index_count(), 3);
    assert_eq!(first.index_format, Format::INDEX_U16);

    // Two nodes, one glTF mesh: shared buffers, separate transforms.
    assert!(first.vertex_buffer.ptr_eq(&second.vertex_buffer));
    assert!(approx_vec3(first.matrix.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0)));
    assert!(approx_vec3(second.matrix.transform_point3(Vec3::ZERO), Vec3::new(-1.0, 0.0, 0.0)));

    let binding = model.material(0).unwrap();
    assert_eq!(binding.material.name.as_deref(), Some("red"));
    assert!(approx_vec3(binding.material.color, Vec3::X));
    assert!((binding.material.metallic - 0.25).abs() < EPSILON);
    assert!((binding.material.roughness - 0.5).abs() < EPSILON);
    assert!(Arc::ptr_eq(&binding.shader, models.default_shader()));
}

#[test]
fn gltf_missing_normals_default_to_up() {
    let dir = temp_dir("gltf-normals");
    let path = write_triangle_gltf(&dir);
    let (mut ctx, mut models, mut textures) = setup();

    let model = models.load_model(&mut ctx, &mut textures, &path).unwrap();
    let mesh = &model.meshes()[0];
    let view = mesh.views[&Slot::Normal];
    let normals: Vec<f32> = bytemuck::pod_collect_to_vec(&mesh.vertex_buffer.read().data()[view.byte_range()]);
    assert_eq!(&normals[..3], &[0.0, 1.0, 0.0]);
}

#[test]
fn repeated_load_returns_same_model() {
    let dir = temp_dir("gltf-dedup");
    let path = write_triangle_gltf(&dir);
    let (mut ctx, mut models, mut textures) = setup();

    let a = models.load_model(&mut ctx, &mut textures, &path).unwrap();
    let b = models.load_model(&mut ctx, &mut textures, &path).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(models.len(), 1);
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = temp_dir("obj");
    let path = dir.join("mesh.obj");
    std::fs::write(&path, "v 0 0 0\n").unwrap();
    let (mut ctx, mut models, mut textures) = setup();

    let err = models.load_model(&mut ctx, &mut textures, &path).unwrap_err();
    assert!(matches!(err, KilnError::UnsupportedModelFormat(ref p) if p == &path), "{err}");
    assert!(models.is_empty());
}

#[test]
fn unreadable_gltf_is_an_error() {
    let dir = temp_dir("gltf-bad");
    let path = dir.join("broken.gltf");
    std::fs::write(&path, "{ not json").unwrap();
    let (mut ctx, mut models, mut textures) = setup();

    let err = models.load_model(&mut ctx, &mut textures, &path).unwrap_err();
    assert!(matches!(err, KilnError::GltfError(_)), "{err}");
    assert!(models.is_empty());
}

#[test]
fn loaded_model_is_independent_of_identity_transform() {
    let dir = temp_dir("gltf-identity");
    let path = write_triangle_gltf(&dir);
    let (mut ctx, mut models, mut textures) = setup();

    let model = models.load_model(&mut ctx, &mut textures, &path).unwrap();
    assert_ne!(model.meshes()[0].matrix, Mat4::IDENTITY);
    // Geometry stays in local space; placement lives in the matrix.
    let view = model.meshes()[0].views[&Slot::Position];
    let positions: Vec<f32> =
        bytemuck::pod_collect_to_vec(&model.meshes()[0].vertex_buffer.read().data()[view.byte_range()]);
    assert_eq!(&positions[3..6], &[1.0, 0.0, 0.0]);
}
