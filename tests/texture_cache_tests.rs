//! Texture Cache Tests
//!
//! Tests for:
//! - load_texture: path deduplication, dense handles, native vs HDR pipelines
//! - HDR decoding: float RGB, vertical flip
//! - Failure modes: unreadable files are errors, cache unchanged
//! - create_texture: pixel length check, sampler policy
//! - get_texture_from_handle: out-of-range handles panic
//! - load_cube_map: six layers, face validation
//! - Drop: textures are released with the cache

mod common;

use kiln::assets::texture_cache::{TextureCache, solid};
use kiln::errors::KilnError;
use kiln::resources::format::{Dimension, ElementType, Format};
use kiln::resources::texture::{TextureKind, TextureSampler, WrapMode};
use kiln::settings::TextureSettings;

use common::{RGBE_ONE, RGBE_TWO, headless, temp_dir, write_hdr, write_png_rgb, write_png_rgba};

fn cache() -> TextureCache {
    TextureCache::new(&TextureSettings::default())
}

// ============================================================================
// Loading & Deduplication
// ============================================================================

#[test]
fn handles_are_dense_and_deduplicated() {
    let dir = temp_dir("dedup");
    let brick = dir.join("brick.png");
    let sky = dir.join("sky.hdr");
    write_png_rgb(&brick, 4, 4, [200, 100, 50]);
    write_hdr(&sky, 2, &[RGBE_ONE, RGBE_ONE]);

    let mut ctx = headless();
    let mut textures = cache();

    let a = textures.load_texture(&mut ctx, &brick).unwrap();
    let b = textures.load_texture(&mut ctx, &sky).unwrap();
    let c = textures.load_texture(&mut ctx, &brick).unwrap();

    assert_eq!(a.index(), 0);
    assert_eq!(b.index(), 1);
    assert_eq!(c, a);
    assert_eq!(textures.len(), 2);
    assert_eq!(ctx.device().texture_uploads(), 2);
    assert_eq!(textures.handle_for_path(&brick), Some(a));
    assert_eq!(textures.get_texture_from_handle(a).format, Format::RGB8);
    assert_eq!(textures.get_texture_from_handle(b).format, Format::VEC3);
}

#[test]
fn handles_strictly_increase() {
    let mut ctx = headless();
    let mut textures = cache();

    let handles: Vec<_> = (0..5)
        .map(|i| textures.create_solid_color(&mut ctx, &format!("solid{i}"), solid::GRAY))
        .collect();

    for pair in handles.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    assert_eq!(handles.last().unwrap().index(), 4);
}

#[test]
fn png_keeps_native_layout() {
    let dir = temp_dir("native");
    let rgba = dir.join("rgba.png");
    let rgb = dir.join("rgb.png");
    write_png_rgba(&rgba, 3, 2, [1, 2, 3, 4]);
    write_png_rgb(&rgb, 3, 2, [9, 8, 7]);

    let mut ctx = headless();
    let mut textures = cache();
    let rgba = textures.load_texture(&mut ctx, &rgba).unwrap();
    let rgb = textures.load_texture(&mut ctx, &rgb).unwrap();

    let rgba = textures.get_texture_from_handle(rgba);
    assert_eq!(rgba.size(), (3, 2));
    assert_eq!(rgba.format, Format::RGBA8);
    assert_eq!(rgba.kind, TextureKind::Tex2D);
    let uploaded = ctx.device().texture(rgba.id()).unwrap();
    assert_eq!(uploaded.layers[0].len(), 3 * 2 * 4);
    assert_eq!(&uploaded.layers[0][..4], &[1, 2, 3, 4]);

    let rgb = textures.get_texture_from_handle(rgb);
    assert_eq!(rgb.format, Format::RGB8);
    assert_eq!(ctx.device().texture(rgb.id()).unwrap().layers[0].len(), 3 * 2 * 3);
}

#[test]
fn hdr_decodes_to_float_rgb_flipped() {
    let dir = temp_dir("hdr");
    let path = dir.join("sky.hdr");
    // Top row 1.0, bottom row 2.0.
    write_hdr(&path, 2, &[RGBE_ONE, RGBE_TWO]);

    let mut ctx = headless();
    let mut textures = cache();
    let handle = textures.load_texture(&mut ctx, &path).unwrap();

    let texture = textures.get_texture_from_handle(handle);
    assert_eq!(texture.format, Format::new(ElementType::Float32, Dimension::Vec3));
    assert_eq!(texture.size(), (2, 2));

    let pixels: Vec<f32> = bytemuck::pod_collect_to_vec(&ctx.device().texture(texture.id()).unwrap().layers[0]);
    assert_eq!(pixels.len(), 2 * 2 * 3);
    // After the flip the first stored row is the bottom one.
    assert!((pixels[0] - 2.0).abs() < 1e-4);
    assert!((pixels[6] - 1.0).abs() < 1e-4);
}

// ============================================================================
// Failure Modes
// ============================================================================

#[test]
fn missing_file_is_an_error() {
    let mut ctx = headless();
    let mut textures = cache();
    let result = textures.load_texture(&mut ctx, "/definitely/not/here.png");
    assert!(result.is_err());
    assert!(textures.is_empty());
    assert_eq!(ctx.device().texture_uploads(), 0);
}

#[test]
fn undecodable_file_is_an_error() {
    let dir = temp_dir("garbage");
    let path = dir.join("broken.png");
    std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really a png").unwrap();

    let mut ctx = headless();
    let mut textures = cache();
    let err = textures.load_texture(&mut ctx, &path).unwrap_err();
    assert!(matches!(err, KilnError::ImageDecodeError(_)), "{err}");
    assert!(textures.handle_for_path(&path).is_none());
}

// ============================================================================
// Raw Creation
// ============================================================================

#[test]
fn create_texture_uses_cache_sampler() {
    let mut ctx = headless();
    let mut textures = cache();
    let handle = textures.create_texture(&mut ctx, Some("checker"), 2, 2, Format::RGBA8, &[0u8; 16]);

    let texture = textures.get_texture_from_handle(handle);
    assert_eq!(texture.sampler, TextureSampler::clamp_linear());
    assert_eq!(texture.name.as_deref(), Some("checker"));
}

#[test]
fn create_texture_with_sampler_keeps_it() {
    let mut ctx = headless();
    let mut textures = cache();
    let handle = textures.create_texture_with_sampler(
        &mut ctx,
        None,
        1,
        1,
        Format::RGBA8,
        &solid::WHITE,
        TextureSampler::repeat_linear(),
    );
    assert_eq!(textures.get_texture_from_handle(handle).sampler.wrap, WrapMode::Repeat);
}

#[test]
fn extra_pixel_bytes_are_ignored() {
    let mut ctx = headless();
    let mut textures = cache();
    let handle = textures.create_texture(&mut ctx, None, 1, 1, Format::RGBA8, &[1, 2, 3, 4, 5, 6]);
    let id = textures.get_texture_from_handle(handle).id();
    assert_eq!(ctx.device().texture(id).unwrap().layers[0], vec![1, 2, 3, 4]);
}

#[test]
#[should_panic(expected = "bytes of pixel data")]
fn short_pixel_buffer_panics() {
    let mut ctx = headless();
    let mut textures = cache();
    textures.create_texture(&mut ctx, Some("short"), 4, 4, Format::RGBA8, &[0u8; 15]);
}

#[test]
#[should_panic(expected = "out of range")]
fn out_of_range_handle_panics() {
    let mut ctx = headless();
    let mut big = cache();
    big.create_solid_color(&mut ctx, "a", solid::WHITE);
    let foreign = big.create_solid_color(&mut ctx, "b", solid::BLACK);

    let mut small = cache();
    small.create_solid_color(&mut ctx, "only", solid::WHITE);
    let _ = small.get_texture_from_handle(foreign);
}

#[test]
fn get_returns_none_out_of_range() {
    let mut ctx = headless();
    let mut big = cache();
    big.create_solid_color(&mut ctx, "a", solid::WHITE);
    let foreign = big.create_solid_color(&mut ctx, "b", solid::FLAT_NORMAL);

    assert!(cache().get(foreign).is_none());
    assert!(big.get(foreign).is_some());
}

// ============================================================================
// Cube Maps
// ============================================================================

fn write_faces(dir: &std::path::Path, sizes: [u32; 6]) -> [std::path::PathBuf; 6] {
    let names = ["px", "nx", "py", "ny", "pz", "nz"];
    std::array::from_fn(|i| {
        let path = dir.join(format!("{}.png", names[i]));
        write_png_rgba(&path, sizes[i], sizes[i], [i as u8, 0, 0, 255]);
        path
    })
}

#[test]
fn cube_map_uploads_six_layers() {
    let dir = temp_dir("cube");
    let faces = write_faces(&dir, [4; 6]);

    let mut ctx = headless();
    let mut textures = cache();
    let handle = textures.load_cube_map(&mut ctx, faces.clone()).unwrap();
    let again = textures.load_cube_map(&mut ctx, faces).unwrap();
    assert_eq!(handle, again);

    let texture = textures.get_texture_from_handle(handle);
    assert_eq!(texture.kind, TextureKind::TexCube);
    let uploaded = ctx.device().texture(texture.id()).unwrap();
    assert_eq!(uploaded.layers.len(), 6);
    assert_eq!(uploaded.layers[3][0], 3);
    assert_eq!(ctx.device().texture_uploads(), 1);
}

#[test]
fn cube_map_rejects_mismatched_faces() {
    let dir = temp_dir("cube-bad");
    let faces = write_faces(&dir, [4, 4, 4, 8, 4, 4]);

    let mut ctx = headless();
    let mut textures = cache();
    let err = textures.load_cube_map(&mut ctx, faces).unwrap_err();
    assert!(matches!(err, KilnError::CubeMapError(_)), "{err}");
    assert!(textures.is_empty());
}

// ============================================================================
// Ownership
// ============================================================================

#[test]
fn dropping_cache_releases_textures() {
    let mut ctx = headless();
    let mut textures = cache();
    textures.create_solid_color(&mut ctx, "white", solid::WHITE);
    textures.create_solid_color(&mut ctx, "black", solid::BLACK);
    assert_eq!(ctx.device().object_count(), 2);

    drop(textures);
    kiln::renderer::Backend::new().end_frame(&mut ctx);
    assert_eq!(ctx.device().object_count(), 0);
}
