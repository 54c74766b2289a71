//! Format and Backend Mapping Tests
//!
//! Tests for:
//! - Format: stride = element size x component count for every combination
//! - Format::from_components_and_bits: decoder layouts to formats
//! - Backend mapping: texture, vertex and index formats, sampler modes
//! - RGB expansion: alpha fill per element type

use kiln::renderer::mapping::{
    expand_rgb_to_rgba, to_address_mode, to_backend_index_format, to_backend_texture_format,
    to_backend_vertex_format, to_filter_mode, upload_format,
};
use kiln::resources::format::{Dimension, ElementType, Format};
use kiln::resources::texture::{FilterMode, WrapMode};

const ELEMENTS: [ElementType; 8] = [
    ElementType::Float32,
    ElementType::Float16,
    ElementType::Int32,
    ElementType::Int16,
    ElementType::Int8,
    ElementType::UInt32,
    ElementType::UInt16,
    ElementType::UInt8,
];

const DIMENSIONS: [Dimension; 4] = [Dimension::Scalar, Dimension::Vec2, Dimension::Vec3, Dimension::Vec4];

// ============================================================================
// Format Tests
// ============================================================================

#[test]
fn stride_is_element_size_times_count() {
    for element in ELEMENTS {
        for dimension in DIMENSIONS {
            let format = Format::new(element, dimension);
            assert_eq!(format.stride(), element.size() * dimension.count(), "{format:?}");
            assert_eq!(format.size(), element.size());
            assert_eq!(format.dimension_size(), dimension.count());
        }
    }
}

#[test]
fn default_format_is_uint32_vec4() {
    assert_eq!(Format::default(), Format::new(ElementType::UInt32, Dimension::Vec4));
    assert_eq!(Format::default().stride(), 16);
}

#[test]
fn common_formats() {
    assert_eq!(Format::VEC3.stride(), 12);
    assert_eq!(Format::VEC2.stride(), 8);
    assert_eq!(Format::RGBA8.stride(), 4);
    assert_eq!(Format::RGB8.stride(), 3);
    assert_eq!(Format::INDEX_U16.stride(), 2);
    assert_eq!(Format::INDEX_U32.stride(), 4);
}

#[test]
fn from_components_and_bits_maps_decoder_layouts() {
    assert_eq!(Format::from_components_and_bits(4, 8), Format::RGBA8);
    assert_eq!(Format::from_components_and_bits(3, 8), Format::RGB8);
    assert_eq!(
        Format::from_components_and_bits(1, 16),
        Format::new(ElementType::UInt16, Dimension::Scalar)
    );
    assert_eq!(
        Format::from_components_and_bits(2, 32),
        Format::new(ElementType::UInt32, Dimension::Vec2)
    );
}

#[test]
fn from_components_and_bits_grid() {
    for components in 1..=4u32 {
        for bits in [8u32, 16, 32] {
            let format = Format::from_components_and_bits(components, bits);
            assert_eq!(format.dimension_size(), components as usize);
            assert_eq!(format.size() * 8, bits as usize);
            assert!(!format.element.is_float());
        }
    }
}

#[test]
fn unknown_bits_and_components_fall_back() {
    assert_eq!(ElementType::unsigned_from_bits(12), ElementType::UInt32);
    assert_eq!(Dimension::from_count(7), Dimension::Vec4);
    assert_eq!(Dimension::from_count(0), Dimension::Vec4);
}

// ============================================================================
// Backend Mapping Tests
// ============================================================================

#[test]
fn texture_formats() {
    use wgpu::TextureFormat as Tf;

    assert_eq!(to_backend_texture_format(Format::RGBA8), Tf::Rgba8Unorm);
    assert_eq!(to_backend_texture_format(Format::from_components_and_bits(1, 8)), Tf::R8Unorm);
    assert_eq!(to_backend_texture_format(Format::from_components_and_bits(4, 16)), Tf::Rgba16Unorm);
    assert_eq!(to_backend_texture_format(Format::VEC4), Tf::Rgba32Float);
    assert_eq!(
        to_backend_texture_format(Format::new(ElementType::Float16, Dimension::Vec4)),
        Tf::Rgba16Float
    );
    // Three-component data is uploaded with an alpha channel.
    assert_eq!(to_backend_texture_format(Format::RGB8), Tf::Rgba8Unorm);
    assert_eq!(to_backend_texture_format(Format::VEC3), Tf::Rgba32Float);
}

#[test]
fn unmapped_texture_format_uses_default() {
    assert_eq!(
        to_backend_texture_format(Format::new(ElementType::Int32, Dimension::Vec4)),
        wgpu::TextureFormat::Rgba32Sint
    );
}

#[test]
fn vertex_formats() {
    use wgpu::VertexFormat as Vf;

    assert_eq!(to_backend_vertex_format(Format::FLOAT32), Vf::Float32);
    assert_eq!(to_backend_vertex_format(Format::VEC2), Vf::Float32x2);
    assert_eq!(to_backend_vertex_format(Format::VEC3), Vf::Float32x3);
    assert_eq!(to_backend_vertex_format(Format::VEC4), Vf::Float32x4);
    assert_eq!(to_backend_vertex_format(Format::RGBA8), Vf::Unorm8x4);
}

#[test]
fn index_formats() {
    assert_eq!(to_backend_index_format(Format::INDEX_U16), wgpu::IndexFormat::Uint16);
    assert_eq!(to_backend_index_format(Format::INDEX_U32), wgpu::IndexFormat::Uint32);
}

#[test]
fn sampler_modes() {
    assert_eq!(to_address_mode(WrapMode::ClampToEdge), wgpu::AddressMode::ClampToEdge);
    assert_eq!(to_address_mode(WrapMode::Repeat), wgpu::AddressMode::Repeat);
    assert_eq!(to_address_mode(WrapMode::MirroredRepeat), wgpu::AddressMode::MirrorRepeat);
    assert_eq!(to_filter_mode(FilterMode::Nearest), wgpu::FilterMode::Nearest);
    assert_eq!(to_filter_mode(FilterMode::Linear), wgpu::FilterMode::Linear);
}

// ============================================================================
// RGB Expansion Tests
// ============================================================================

#[test]
fn rgb16_expands_with_max_alpha() {
    let rgb = [1u16, 2, 3];
    let format = Format::from_components_and_bits(3, 16);
    let rgba: Vec<u16> = bytemuck::pod_collect_to_vec(&expand_rgb_to_rgba(format, bytemuck::cast_slice(&rgb)));
    assert_eq!(rgba, vec![1, 2, 3, u16::MAX]);
    assert_eq!(upload_format(format), Format::from_components_and_bits(4, 16));
}

#[test]
fn four_component_data_is_unchanged() {
    let rgba = [1u8, 2, 3, 4];
    assert_eq!(expand_rgb_to_rgba(Format::RGBA8, &rgba), rgba.to_vec());
    assert_eq!(upload_format(Format::RGBA8), Format::RGBA8);
}
