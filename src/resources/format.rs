//! Element Formats
//!
//! A [`Format`] describes one vertex attribute or texel: the numeric type of
//! each component and how many components there are.
//!
//! ```rust,ignore
//! use kiln::resources::format::{Format, ElementType, Dimension};
//!
//! let position = Format::new(ElementType::Float32, Dimension::Vec3);
//! assert_eq!(position.stride(), 12);
//!
//! // 8-bit RGBA as reported by an image decoder
//! let rgba8 = Format::from_components_and_bits(4, 8);
//! assert_eq!(rgba8, Format::new(ElementType::UInt8, Dimension::Vec4));
//! ```

/// Numeric type of a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Float32,
    Float16,
    Int32,
    Int16,
    Int8,
    UInt32,
    UInt16,
    UInt8,
}

impl ElementType {
    /// Bytes per component.
    #[inline]
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Float32 | Self::Int32 | Self::UInt32 => 4,
            Self::Float16 | Self::Int16 | Self::UInt16 => 2,
            Self::Int8 | Self::UInt8 => 1,
        }
    }

    /// Unsigned integer type of the given bit width. Unknown widths map to `UInt32`.
    #[must_use]
    pub const fn unsigned_from_bits(bits: u32) -> Self {
        match bits {
            8 => Self::UInt8,
            16 => Self::UInt16,
            _ => Self::UInt32,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float16)
    }
}

/// Component count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
}

impl Dimension {
    #[inline]
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }

    /// Dimension with the given component count. Unknown counts map to `Vec4`.
    #[must_use]
    pub const fn from_count(components: u32) -> Self {
        match components {
            1 => Self::Scalar,
            2 => Self::Vec2,
            3 => Self::Vec3,
            _ => Self::Vec4,
        }
    }
}

/// Element type plus component count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Format {
    pub element: ElementType,
    pub dimension: Dimension,
}

impl Default for Format {
    /// `UInt32 x 4`, the fallback for unrecognized decoder output.
    fn default() -> Self {
        Self::new(ElementType::UInt32, Dimension::Vec4)
    }
}

impl Format {
    #[inline]
    #[must_use]
    pub const fn new(element: ElementType, dimension: Dimension) -> Self {
        Self { element, dimension }
    }

    /// Bytes per component.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.element.size()
    }

    /// Bytes per full element (all components).
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.element.size() * self.dimension.count()
    }

    #[inline]
    #[must_use]
    pub const fn dimension_size(&self) -> usize {
        self.dimension.count()
    }

    /// Builds an unsigned format from an image decoder's channel count and
    /// bit depth.
    ///
    /// This never fails: component counts outside `1..=3` become `Vec4`
    /// and bit widths other than 8 and 16 become `UInt32`.
    #[must_use]
    pub const fn from_components_and_bits(components: u32, bits: u32) -> Self {
        Self::new(
            ElementType::unsigned_from_bits(bits),
            Dimension::from_count(components),
        )
    }

    // Common formats.

    pub const FLOAT32: Self = Self::new(ElementType::Float32, Dimension::Scalar);
    pub const VEC2: Self = Self::new(ElementType::Float32, Dimension::Vec2);
    pub const VEC3: Self = Self::new(ElementType::Float32, Dimension::Vec3);
    pub const VEC4: Self = Self::new(ElementType::Float32, Dimension::Vec4);
    pub const RGB8: Self = Self::new(ElementType::UInt8, Dimension::Vec3);
    pub const RGBA8: Self = Self::new(ElementType::UInt8, Dimension::Vec4);
    pub const INDEX_U16: Self = Self::new(ElementType::UInt16, Dimension::Scalar);
    pub const INDEX_U32: Self = Self::new(ElementType::UInt32, Dimension::Scalar);
}
