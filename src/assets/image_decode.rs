//! Image Decoding
//!
//! Two pipelines, chosen by inspecting the file header rather than trusting
//! the extension:
//!
//! - **HDR** (Radiance `.hdr`, OpenEXR): decoded to 32-bit float RGB and
//!   flipped vertically.
//! - **Everything else**: decoded at the source's native channel count and
//!   bit depth, without a flip.

use std::io::{BufRead, Seek};
use std::path::Path;

use image::{DynamicImage, ImageFormat, ImageReader};

use crate::errors::Result;
use crate::resources::format::{Dimension, ElementType, Format};

/// Decoded pixels, tightly packed rows, first row at the top (or bottom for HDR).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub pixels: Vec<u8>,
}

/// Whether a detected container format goes through the float pipeline.
#[must_use]
pub fn is_hdr_format(format: Option<ImageFormat>) -> bool {
    matches!(format, Some(ImageFormat::Hdr | ImageFormat::OpenExr))
}

/// Opens and decodes an image file.
pub fn decode_file(path: &Path) -> Result<DecodedImage> {
    let reader = ImageReader::open(path)?;
    decode_reader(reader)
}

/// Decodes an in-memory encoded image (e.g. a glTF-embedded PNG).
pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedImage> {
    decode_reader(ImageReader::new(std::io::Cursor::new(bytes)))
}

fn decode_reader<R: BufRead + Seek>(reader: ImageReader<R>) -> Result<DecodedImage> {
    let reader = reader.with_guessed_format()?;
    let hdr = is_hdr_format(reader.format());
    let image = reader.decode()?;

    Ok(if hdr {
        decode_float(&image)
    } else {
        decode_native(image)
    })
}

fn decode_float(image: &DynamicImage) -> DecodedImage {
    let rgb = image.flipv().into_rgb32f();
    let (width, height) = rgb.dimensions();
    DecodedImage {
        width,
        height,
        format: Format::VEC3,
        pixels: bytemuck::cast_slice(rgb.as_raw()).to_vec(),
    }
}

/// Keeps the decoder's layout. Unusual layouts are converted to RGBA8.
fn decode_native(image: DynamicImage) -> DecodedImage {
    let (width, height) = (image.width(), image.height());
    let color = image.color();
    let channels = u32::from(color.channel_count());

    let (format, pixels) = match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => {
            let bits = u32::from(color.bytes_per_pixel()) * 8 / channels;
            (
                Format::from_components_and_bits(channels, bits),
                image.into_bytes(),
            )
        }
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => (
            Format::new(ElementType::Float32, Dimension::from_count(channels)),
            image.into_bytes(),
        ),
        other => (Format::RGBA8, other.into_rgba8().into_raw()),
    };

    DecodedImage {
        width,
        height,
        format,
        pixels,
    }
}
