//! Format → wgpu Enum Mapping
//!
//! Total functions translating engine descriptions into `wgpu` vocabulary.
//! Combinations without a direct counterpart fall through to a designated
//! default arm (`Vec4`/`Int32`) instead of failing; new element types or
//! dimensions degrade to that layout until they get an explicit mapping.
//!
//! `wgpu` has no three-component texture formats: `Vec3` texel data maps to
//! the matching four-component format and is widened on upload (see
//! [`expand_rgb_to_rgba`]).

use wgpu::{TextureFormat as Tf, VertexFormat as Vf};

use crate::resources::format::{Dimension, ElementType, Format};
use crate::resources::texture::{FilterMode, WrapMode};

/// Texture format used for texel data of the given [`Format`].
///
/// 8 and 16-bit unsigned data is treated as normalized color; 32-bit
/// unsigned and all signed data stays integer.
#[must_use]
pub fn to_backend_texture_format(format: Format) -> Tf {
    use Dimension::{Scalar, Vec2, Vec3, Vec4};
    use ElementType::{Float16, Float32, Int8, Int16, Int32, UInt8, UInt16, UInt32};

    match (format.element, format.dimension) {
        (UInt8, Scalar) => Tf::R8Unorm,
        (UInt8, Vec2) => Tf::Rg8Unorm,
        (UInt8, Vec3 | Vec4) => Tf::Rgba8Unorm,
        (Int8, Scalar) => Tf::R8Sint,
        (Int8, Vec2) => Tf::Rg8Sint,
        (Int8, Vec3 | Vec4) => Tf::Rgba8Sint,
        (UInt16, Scalar) => Tf::R16Unorm,
        (UInt16, Vec2) => Tf::Rg16Unorm,
        (UInt16, Vec3 | Vec4) => Tf::Rgba16Unorm,
        (Int16, Scalar) => Tf::R16Sint,
        (Int16, Vec2) => Tf::Rg16Sint,
        (Int16, Vec3 | Vec4) => Tf::Rgba16Sint,
        (Float16, Scalar) => Tf::R16Float,
        (Float16, Vec2) => Tf::Rg16Float,
        (Float16, Vec3 | Vec4) => Tf::Rgba16Float,
        (Float32, Scalar) => Tf::R32Float,
        (Float32, Vec2) => Tf::Rg32Float,
        (Float32, Vec3 | Vec4) => Tf::Rgba32Float,
        (UInt32, Scalar) => Tf::R32Uint,
        (UInt32, Vec2) => Tf::Rg32Uint,
        (UInt32, Vec3 | Vec4) => Tf::Rgba32Uint,
        (Int32, Scalar) => Tf::R32Sint,
        (Int32, Vec2) => Tf::Rg32Sint,
        // Int32 x 3/4 and anything added later.
        _ => Tf::Rgba32Sint,
    }
}

/// Vertex attribute format for a stream of the given [`Format`].
///
/// 8 and 16-bit integer attributes are read as normalized floats, which is
/// how glTF stores quantized colors and texture coordinates.
#[must_use]
pub fn to_backend_vertex_format(format: Format) -> Vf {
    use Dimension::{Scalar, Vec2, Vec3, Vec4};
    use ElementType::{Float16, Float32, Int8, Int16, Int32, UInt8, UInt16, UInt32};

    match (format.element, format.dimension) {
        (Float32, Scalar) => Vf::Float32,
        (Float32, Vec2) => Vf::Float32x2,
        (Float32, Vec3) => Vf::Float32x3,
        (Float32, Vec4) => Vf::Float32x4,
        (Float16, Scalar) => Vf::Float16,
        (Float16, Vec2) => Vf::Float16x2,
        (Float16, Vec3 | Vec4) => Vf::Float16x4,
        (UInt8, Scalar) => Vf::Unorm8,
        (UInt8, Vec2) => Vf::Unorm8x2,
        (UInt8, Vec3 | Vec4) => Vf::Unorm8x4,
        (Int8, Scalar) => Vf::Snorm8,
        (Int8, Vec2) => Vf::Snorm8x2,
        (Int8, Vec3 | Vec4) => Vf::Snorm8x4,
        (UInt16, Scalar) => Vf::Unorm16,
        (UInt16, Vec2) => Vf::Unorm16x2,
        (UInt16, Vec3 | Vec4) => Vf::Unorm16x4,
        (Int16, Scalar) => Vf::Snorm16,
        (Int16, Vec2) => Vf::Snorm16x2,
        (Int16, Vec3 | Vec4) => Vf::Snorm16x4,
        (UInt32, Scalar) => Vf::Uint32,
        (UInt32, Vec2) => Vf::Uint32x2,
        (UInt32, Vec3) => Vf::Uint32x3,
        (UInt32, Vec4) => Vf::Uint32x4,
        (Int32, Scalar) => Vf::Sint32,
        (Int32, Vec2) => Vf::Sint32x2,
        (Int32, Vec3) => Vf::Sint32x3,
        // Int32 x 4 and anything added later.
        _ => Vf::Sint32x4,
    }
}

/// Index format for an index buffer. Anything but `UInt16` is read as 32-bit.
#[must_use]
pub fn to_backend_index_format(format: Format) -> wgpu::IndexFormat {
    match format.element {
        ElementType::UInt16 | ElementType::Int16 => wgpu::IndexFormat::Uint16,
        _ => wgpu::IndexFormat::Uint32,
    }
}

#[must_use]
pub fn to_address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

#[must_use]
pub fn to_filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

#[must_use]
pub fn to_mipmap_filter(filter: FilterMode) -> wgpu::MipmapFilterMode {
    match filter {
        FilterMode::Nearest => wgpu::MipmapFilterMode::Nearest,
        FilterMode::Linear => wgpu::MipmapFilterMode::Linear,
    }
}

/// Format actually stored on the GPU for texel data of `format`.
#[must_use]
pub fn upload_format(format: Format) -> Format {
    if format.dimension == Dimension::Vec3 {
        Format::new(format.element, Dimension::Vec4)
    } else {
        format
    }
}

/// Widens tightly packed 3-component texels to 4 components.
///
/// Alpha is "one" in the element's unit: max value for normalized integers,
/// 1.0 for floats, 1 for integer formats. Other layouts are returned as-is.
#[must_use]
pub fn expand_rgb_to_rgba(format: Format, data: &[u8]) -> Vec<u8> {
    if format.dimension != Dimension::Vec3 {
        return data.to_vec();
    }

    let alpha: Vec<u8> = match format.element {
        ElementType::UInt8 => vec![u8::MAX],
        ElementType::Int8 => vec![1],
        ElementType::UInt16 => u16::MAX.to_ne_bytes().to_vec(),
        ElementType::Int16 => 1i16.to_ne_bytes().to_vec(),
        ElementType::Float16 => half::f16::ONE.to_bits().to_ne_bytes().to_vec(),
        ElementType::Float32 => 1.0f32.to_ne_bytes().to_vec(),
        ElementType::UInt32 => 1u32.to_ne_bytes().to_vec(),
        ElementType::Int32 => 1i32.to_ne_bytes().to_vec(),
    };

    let texel = format.stride();
    let mut out = Vec::with_capacity(data.len() / texel * (texel + alpha.len()));
    for rgb in data.chunks_exact(texel) {
        out.extend_from_slice(rgb);
        out.extend_from_slice(&alpha);
    }
    out
}
