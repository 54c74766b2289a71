//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use kiln::renderer::{GpuContext, HeadlessDevice, Shader};
use kiln::settings::ShaderSettings;

pub type Ctx = GpuContext<HeadlessDevice>;

pub fn headless() -> Ctx {
    let _ = env_logger::builder().is_test(true).try_init();
    GpuContext::new(HeadlessDevice::new())
}

// ============================================================================
// Files
// ============================================================================

/// Fresh directory under the system temp dir, unique per call.
pub fn temp_dir(name: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("kiln-{name}-{}-{id}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_png_rgba(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    image::RgbaImage::from_pixel(width, height, image::Rgba(rgba)).save(path).unwrap();
}

pub fn write_png_rgb(path: &Path, width: u32, height: u32, rgb: [u8; 3]) {
    image::RgbImage::from_pixel(width, height, image::Rgb(rgb)).save(path).unwrap();
}

/// Uncompressed Radiance file, `rows` top to bottom, one RGBE color per row.
/// Keep `width` below 8 so readers take the flat path.
pub fn write_hdr(path: &Path, width: u32, rows: &[[u8; 4]]) {
    let height = rows.len();
    let mut bytes = format!("#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y {height} +X {width}\n").into_bytes();
    for rgbe in rows {
        for _ in 0..width {
            bytes.extend_from_slice(rgbe);
        }
    }
    std::fs::write(path, bytes).unwrap();
}

/// RGBE encoding of 1.0.
pub const RGBE_ONE: [u8; 4] = [128, 128, 128, 129];
/// RGBE encoding of 2.0.
pub const RGBE_TWO: [u8; 4] = [128, 128, 128, 130];

/// One red triangle, drawn by two nodes: the second reuses the mesh.
pub fn write_triangle_gltf(dir: &Path) -> PathBuf {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u16; 4] = [0, 1, 2, 0];

    let mut bin = Vec::new();
    bin.extend_from_slice(bytemuck::cast_slice(&positions));
    bin.extend_from_slice(bytemuck::cast_slice(&indices));
    std::fs::write(dir.join("triangle.bin"), &bin).unwrap();

    let json = format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0, 1] }}],
  "nodes": [
    {{ "mesh": 0, "translation": [1.0, 2.0, 3.0] }},
    {{ "mesh": 0, "translation": [-1.0, 0.0, 0.0] }}
  ],
  "meshes": [{{
    "name": "tri",
    "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }}]
  }}],
  "materials": [{{
    "name": "red",
    "pbrMetallicRoughness": {{ "baseColorFactor": [1.0, 0.0, 0.0, 1.0], "metallicFactor": 0.25, "roughnessFactor": 0.5 }}
  }}],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
       "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }}
  ],
  "buffers": [{{ "uri": "triangle.bin", "byteLength": {} }}]
}}"#,
        bin.len()
    );
    let path = dir.join("triangle.gltf");
    std::fs::write(&path, json).unwrap();
    path
}

// ============================================================================
// Shaders
// ============================================================================

pub const UNIFORMS_WGSL: &str = r"
struct Uniforms {
    model: mat4x4<f32>,
    view_projection: mat4x4<f32>,
    color: vec3<f32>,
    roughness: f32,
    metallic: f32,
    ao: f32,
    has_albedo_map: i32,
};
@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
};
";

pub const VERTEX_BODY: &str = r"
@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.clip = u.view_projection * u.model * vec4<f32>(position, 1.0);
    out.normal = normal;
    out.uv = uv;
    return out;
}
";

pub const FRAGMENT_BODY: &str = r"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let light = max(dot(normalize(in.normal), vec3<f32>(0.0, 1.0, 0.0)), 0.2) * u.ao;
    return vec4<f32>(u.color * light, 1.0);
}
";

pub const TEXTURED_FRAGMENT_BODY: &str = r"
@group(1) @binding(0) var albedo_map: texture_2d<f32>;
@group(1) @binding(1) var albedo_sampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(albedo_map, albedo_sampler, in.uv);
    let base = select(vec4<f32>(1.0), texel, u.has_albedo_map != 0);
    return vec4<f32>(u.color, 1.0) * base;
}
";

pub fn vertex_source() -> String {
    format!("{UNIFORMS_WGSL}{VERTEX_BODY}")
}

pub fn fragment_source() -> String {
    format!("{UNIFORMS_WGSL}{FRAGMENT_BODY}")
}

pub fn textured_fragment_source() -> String {
    format!("{UNIFORMS_WGSL}{TEXTURED_FRAGMENT_BODY}")
}

pub fn basic_shader(ctx: &mut Ctx) -> Arc<Shader> {
    let shader = Shader::from_source(
        ctx,
        "basic",
        &vertex_source(),
        &fragment_source(),
        &ShaderSettings::default(),
    )
    .unwrap();
    Arc::new(shader)
}

pub fn textured_shader(ctx: &mut Ctx) -> Arc<Shader> {
    let shader = Shader::from_source(
        ctx,
        "textured",
        &vertex_source(),
        &textured_fragment_source(),
        &ShaderSettings::default(),
    )
    .unwrap();
    Arc::new(shader)
}
