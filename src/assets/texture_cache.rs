//! Texture Cache
//!
//! Owns every [`Texture`] of one rendering context and hands out dense
//! [`TextureHandle`]s:
//!
//! - **Deduplication**: files are keyed by the path they were requested
//!   with. A second request returns the first handle without decoding again.
//! - **Stable handles**: storage is append-only. A handle stays valid until
//!   the cache is dropped and is never issued for another texture.
//! - **Ownership**: textures are released when the cache is dropped, not
//!   when consumers stop using a handle.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::assets::image_decode::{self, DecodedImage};
use crate::errors::{KilnError, Result};
use crate::renderer::context::GpuContext;
use crate::renderer::device::{GpuDevice, TextureDescriptor};
use crate::resources::format::Format;
use crate::resources::texture::{Texture, TextureHandle, TextureKind, TextureSampler};
use crate::settings::TextureSettings;

/// RGBA8 fill values for 1×1 fallback textures.
pub mod solid {
    pub const WHITE: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
    pub const BLACK: [u8; 4] = [0x00, 0x00, 0x00, 0xFF];
    pub const GRAY: [u8; 4] = [0x80, 0x80, 0x80, 0xFF];
    /// Tangent-space +Z, the neutral normal map value.
    pub const FLAT_NORMAL: [u8; 4] = [0x80, 0x80, 0xFF, 0xFF];
}

#[derive(Debug)]
pub struct TextureCache {
    textures: Vec<Texture>,
    by_path: FxHashMap<PathBuf, TextureHandle>,
    cube_maps: FxHashMap<[PathBuf; 6], TextureHandle>,
    settings: TextureSettings,
}

impl TextureCache {
    #[must_use]
    pub fn new(settings: &TextureSettings) -> Self {
        Self {
            textures: Vec::with_capacity(settings.initial_capacity),
            by_path: FxHashMap::default(),
            cube_maps: FxHashMap::default(),
            settings: settings.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &TextureSettings {
        &self.settings
    }

    /// Handle previously issued for `path`, without loading anything.
    #[must_use]
    pub fn handle_for_path(&self, path: impl AsRef<Path>) -> Option<TextureHandle> {
        self.by_path.get(path.as_ref()).copied()
    }

    /// Loads an image file, or returns the handle it was loaded under before.
    ///
    /// HDR files go through the float pipeline (vertically flipped); others
    /// keep their native layout. Unreadable files are reported as errors and
    /// leave the cache unchanged.
    pub fn load_texture<D: GpuDevice>(
        &mut self,
        ctx: &mut GpuContext<D>,
        path: impl AsRef<Path>,
    ) -> Result<TextureHandle> {
        let path = path.as_ref();
        if let Some(&handle) = self.by_path.get(path) {
            log::debug!("Texture cache hit: {}", path.display());
            return Ok(handle);
        }

        let image = image_decode::decode_file(path).inspect_err(|e| {
            log::error!("Failed to load texture {}: {e}", path.display());
        })?;

        let name = path.to_string_lossy();
        let handle = self.create_texture(
            ctx,
            Some(&name),
            image.width,
            image.height,
            image.format,
            &image.pixels,
        );
        self.by_path.insert(path.to_path_buf(), handle);
        log::debug!(
            "Loaded texture {} ({}x{}, {:?})",
            path.display(),
            image.width,
            image.height,
            image.format
        );
        Ok(handle)
    }

    /// Loads six face images (+X, -X, +Y, -Y, +Z, -Z) into a cube map.
    ///
    /// Faces must be square and share size and format.
    pub fn load_cube_map<D: GpuDevice, P: AsRef<Path>>(
        &mut self,
        ctx: &mut GpuContext<D>,
        faces: [P; 6],
    ) -> Result<TextureHandle> {
        let key = faces.each_ref().map(|p| p.as_ref().to_path_buf());
        if let Some(&handle) = self.cube_maps.get(&key) {
            return Ok(handle);
        }

        let images = key
            .iter()
            .map(|p| image_decode::decode_file(p))
            .collect::<Result<Vec<DecodedImage>>>()?;

        let first = &images[0];
        if first.width != first.height {
            return Err(KilnError::CubeMapError(format!(
                "face {} is {}x{}, cube faces must be square",
                key[0].display(),
                first.width,
                first.height
            )));
        }
        for (path, image) in key.iter().zip(&images).skip(1) {
            if (image.width, image.height, image.format) != (first.width, first.height, first.format) {
                return Err(KilnError::CubeMapError(format!(
                    "face {} ({}x{}, {:?}) does not match {} ({}x{}, {:?})",
                    path.display(),
                    image.width,
                    image.height,
                    image.format,
                    key[0].display(),
                    first.width,
                    first.height,
                    first.format
                )));
            }
        }

        let layers: Vec<&[u8]> = images.iter().map(|i| i.pixels.as_slice()).collect();
        let name = key[0].to_string_lossy().into_owned();
        let sampler = self.settings.cache_sampler;
        let handle = self.push(
            ctx,
            Some(name),
            TextureDescriptor {
                label: "cube map",
                width: first.width,
                height: first.height,
                format: first.format,
                kind: TextureKind::TexCube,
                sampler,
            },
            &layers,
        );
        self.cube_maps.insert(key, handle);
        Ok(handle)
    }

    /// Uploads raw pixels with the cache sampler (clamp-to-edge + linear).
    ///
    /// # Panics
    /// If `pixels` holds fewer than `width * height * format.stride()` bytes.
    pub fn create_texture<D: GpuDevice>(
        &mut self,
        ctx: &mut GpuContext<D>,
        name: Option<&str>,
        width: u32,
        height: u32,
        format: Format,
        pixels: &[u8],
    ) -> TextureHandle {
        let sampler = self.settings.cache_sampler;
        self.create_texture_with_sampler(ctx, name, width, height, format, pixels, sampler)
    }

    /// [`create_texture`](Self::create_texture) with an explicit sampler.
    pub fn create_texture_with_sampler<D: GpuDevice>(
        &mut self,
        ctx: &mut GpuContext<D>,
        name: Option<&str>,
        width: u32,
        height: u32,
        format: Format,
        pixels: &[u8],
        sampler: TextureSampler,
    ) -> TextureHandle {
        let desc = TextureDescriptor {
            label: name.unwrap_or("texture"),
            width,
            height,
            format,
            kind: TextureKind::Tex2D,
            sampler,
        };
        let expected = desc.layer_size();
        assert!(
            pixels.len() >= expected,
            "texture '{}': {} bytes of pixel data, {}x{} {:?} needs {}",
            desc.label,
            pixels.len(),
            width,
            height,
            format,
            expected
        );
        self.push(ctx, name.map(str::to_string), desc, &[&pixels[..expected]])
    }

    /// 1×1 RGBA8 texture filled with `rgba`. See [`solid`] for common values.
    pub fn create_solid_color<D: GpuDevice>(
        &mut self,
        ctx: &mut GpuContext<D>,
        name: &str,
        rgba: [u8; 4],
    ) -> TextureHandle {
        self.create_texture(ctx, Some(name), 1, 1, Format::RGBA8, &rgba)
    }

    fn push<D: GpuDevice>(
        &mut self,
        ctx: &mut GpuContext<D>,
        name: Option<String>,
        desc: TextureDescriptor<'_>,
        layers: &[&[u8]],
    ) -> TextureHandle {
        let gpu = ctx.create_texture(&desc, layers);
        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(Texture {
            gpu,
            name,
            width: desc.width,
            height: desc.height,
            kind: desc.kind,
            format: desc.format,
            sampler: desc.sampler,
        });
        handle
    }

    /// # Panics
    /// If `handle` was not issued by this cache.
    #[must_use]
    pub fn get_texture_from_handle(&self, handle: TextureHandle) -> &Texture {
        assert!(
            handle.index() < self.textures.len(),
            "texture handle {} out of range ({} textures)",
            handle.index(),
            self.textures.len()
        );
        &self.textures[handle.index()]
    }

    #[must_use]
    pub fn get(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle.index())
    }
}
