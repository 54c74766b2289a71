//! Settings Tests
//!
//! Tests for:
//! - Defaults: sampler policies, primitive sizes, device target
//! - JSON: partial overrides keep defaults, unknown shapes are errors
//! - from_json_file: reading from disk, missing files

mod common;

use std::path::PathBuf;

use kiln::errors::KilnError;
use kiln::resources::texture::{FilterMode, TextureSampler, WrapMode};
use kiln::settings::Settings;

use common::temp_dir;

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn defaults() {
    let settings = Settings::default();

    assert_eq!(settings.shaders.include_dir, None);
    assert_eq!(settings.textures.cache_sampler, TextureSampler::clamp_linear());
    assert_eq!(settings.textures.model_sampler, TextureSampler::repeat_linear());
    assert_eq!(settings.textures.initial_capacity, 20);
    assert_eq!(settings.primitives.sphere_width_segments, 64);
    assert_eq!(settings.primitives.sphere_height_segments, 64);
    assert_eq!((settings.device.target_width, settings.device.target_height), (1280, 720));
    assert_eq!(settings.device.power_preference(), wgpu::PowerPreference::HighPerformance);
}

// ============================================================================
// JSON
// ============================================================================

#[test]
fn empty_object_is_default() {
    assert_eq!(Settings::from_json_str("{}").unwrap(), Settings::default());
}

#[test]
fn partial_overrides_keep_other_defaults() {
    let json = r#"{
        "shaders": { "include_dir": "assets/shaders" },
        "textures": { "cache_sampler": { "wrap": "Repeat", "filter": "Nearest" } },
        "device": { "target_width": 64, "high_performance": false }
    }"#;
    let settings = Settings::from_json_str(json).unwrap();

    assert_eq!(settings.shaders.include_dir, Some(PathBuf::from("assets/shaders")));
    assert_eq!(settings.textures.cache_sampler.wrap, WrapMode::Repeat);
    assert_eq!(settings.textures.cache_sampler.filter, FilterMode::Nearest);
    assert_eq!(settings.textures.model_sampler, TextureSampler::repeat_linear());
    assert_eq!(settings.device.target_width, 64);
    assert_eq!(settings.device.target_height, 720);
    assert_eq!(settings.device.power_preference(), wgpu::PowerPreference::LowPower);
    assert_eq!(settings.primitives, Settings::default().primitives);
}

#[test]
fn malformed_json_is_an_error() {
    let err = Settings::from_json_str(r#"{ "device": { "target_width": "wide" } }"#).unwrap_err();
    assert!(matches!(err, KilnError::JsonError(_)), "{err}");
}

#[test]
fn clear_color_maps_to_wgpu() {
    let settings = Settings::from_json_str(r#"{ "device": { "clear_color": [1.0, 0.5, 0.0, 1.0] } }"#).unwrap();
    let color = settings.device.wgpu_clear_color();
    assert_eq!((color.r, color.g, color.b, color.a), (1.0, 0.5, 0.0, 1.0));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn from_json_file_round_trips_serialized_settings() -> anyhow::Result<()> {
    let dir = temp_dir("settings");
    let path = dir.join("kiln.json");
    let mut settings = Settings::default();
    settings.primitives.cube_size = 3.0;
    std::fs::write(&path, serde_json::to_string_pretty(&settings)?)?;

    assert_eq!(Settings::from_json_file(&path)?, settings);
    Ok(())
}

#[test]
fn missing_file_is_io_error() {
    let err = Settings::from_json_file("/no/such/kiln.json").unwrap_err();
    assert!(matches!(err, KilnError::IoError(_)), "{err}");
}
