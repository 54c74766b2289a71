//! Renders the built-in shapes (and optionally a glTF model) offscreen and
//! writes the frame to a PNG.
//!
//! ```text
//! cargo run -p showcase -- [model.gltf] [--settings kiln.json] [--out frame.png]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use glam::{Mat4, Vec3};

use kiln::assets::{ModelCache, ModelShape, TextureCache};
use kiln::renderer::{Backend, GpuContext, Shader, WgpuDevice};
use kiln::resources::material::Material;
use kiln::resources::format::Format;
use kiln::resources::model::Model;
use kiln::settings::Settings;

struct Args {
    model: Option<PathBuf>,
    settings: Option<PathBuf>,
    out: PathBuf,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        model: None,
        settings: None,
        out: PathBuf::from("showcase.png"),
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--settings" => args.settings = Some(it.next().context("--settings needs a path")?.into()),
            "--out" => args.out = it.next().context("--out needs a path")?.into(),
            _ => args.model = Some(arg.into()),
        }
    }
    Ok(args)
}

/// 8x8 two-tone checker, RGBA8.
fn checker_pixels() -> Vec<u8> {
    (0..64)
        .flat_map(|i| {
            let (x, y) = (i % 8, i / 8);
            if (x + y) % 2 == 0 { [230, 230, 230, 255] } else { [60, 60, 70, 255] }
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let mut settings = match &args.settings {
        Some(path) => Settings::from_json_file(path)?,
        None => Settings::default(),
    };
    let shader_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders");
    if settings.shaders.include_dir.is_none() {
        settings.shaders.include_dir = Some(shader_dir.clone());
    }

    let device = WgpuDevice::new_blocking(&settings.device)?;
    let mut ctx = GpuContext::new(device);

    let shader = Arc::new(Shader::from_files(
        &mut ctx,
        shader_dir.join("lit.vert.wgsl"),
        shader_dir.join("lit.frag.wgsl"),
        &settings.shaders,
    )?);

    let mut textures = TextureCache::new(&settings.textures);
    let mut models = ModelCache::new(Arc::clone(&shader), &settings.primitives);

    let checker = textures.create_texture(&mut ctx, Some("checker"), 8, 8, Format::RGBA8, &checker_pixels());

    // Procedural shapes share one material slot; give the quad a floor of its own.
    let mut floor = Model::new("floor");
    for mesh in models.get_model_shape(ModelShape::Quad).meshes() {
        floor.add_mesh(mesh.instanced(mesh.matrix));
    }
    floor.set_material(
        0,
        Material {
            albedo_map: Some(checker),
            roughness: 0.9,
            ..Default::default()
        },
        Arc::clone(&shader),
    );

    let loaded = match &args.model {
        Some(path) => Some(models.load_model(&mut ctx, &mut textures, path)?),
        None => None,
    };

    let (width, height) = (settings.device.target_width, settings.device.target_height);
    let projection = Mat4::perspective_rh(45f32.to_radians(), width as f32 / height as f32, 0.1, 100.0);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 3.0, 8.0), Vec3::ZERO, Vec3::Y);
    shader.set_uniform_mat4("view_projection", projection * view);

    let mut backend = Backend::new();
    backend.draw_model(
        &mut ctx,
        &floor,
        Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0))
            * Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2)
            * Mat4::from_scale(Vec3::splat(5.0)),
        &textures,
    );
    backend.draw_model(
        &mut ctx,
        &models.get_model_shape(ModelShape::Cube),
        Mat4::from_translation(Vec3::new(-2.0, 0.0, 0.0)) * Mat4::from_rotation_y(0.6),
        &textures,
    );
    backend.draw_model(
        &mut ctx,
        &models.get_model_shape(ModelShape::Sphere),
        Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)),
        &textures,
    );
    if let Some(model) = &loaded {
        backend.draw_model(&mut ctx, model, Mat4::IDENTITY, &textures);
    }

    let stats = backend.end_frame(&mut ctx);
    log::info!("Frame: {stats:?} ({} textures)", textures.len());

    let pixels = ctx.device().read_target_rgba()?;
    let (width, height) = ctx.device().target_size();
    image::RgbaImage::from_raw(width, height, pixels)
        .context("readback size mismatch")?
        .save(&args.out)
        .with_context(|| format!("writing {}", args.out.display()))?;
    log::info!("Wrote {}", args.out.display());

    Ok(())
}
