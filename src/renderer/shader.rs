//! Shader Programs
//!
//! A [`Shader`] is a linked vertex + fragment program plus a CPU copy of its
//! uniform block. Uniform setters write into that copy by member name; the
//! bytes travel to the GPU when the shader is bound for a draw.
//!
//! ```rust,ignore
//! let shader = Shader::from_files(&mut ctx, "shaders/pbr.vert.wgsl", "shaders/pbr.frag.wgsl", &settings.shaders)?;
//! shader.set_uniform_mat4("view_projection", camera.view_projection());
//! shader.set_uniform_vec3("color", Vec3::ONE);
//! shader.bind(&mut backend);
//! ```

use std::path::Path;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use parking_lot::RwLock;

use crate::errors::Result;
use crate::renderer::backend::Backend;
use crate::renderer::context::{GpuContext, GpuResource};
use crate::renderer::device::{GpuDevice, ResourceId};
use crate::renderer::shader_compiler::{
    CompiledProgram, Preprocessor, UniformKind, UniformLayout, compile_program,
};
use crate::settings::ShaderSettings;

/// Linked GPU program with name-addressed uniforms.
#[derive(Debug)]
pub struct Shader {
    label: String,
    program: GpuResource,
    layout: UniformLayout,
    vertex_inputs: Vec<u32>,
    samples_material_texture: bool,
    uniforms: RwLock<Vec<u8>>,
}

impl Shader {
    /// Reads, preprocesses, compiles and links two stage files.
    ///
    /// Failures are logged and returned; nothing panics on bad shader source.
    pub fn from_files<D: GpuDevice>(
        ctx: &mut GpuContext<D>,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
        settings: &ShaderSettings,
    ) -> Result<Self> {
        let (vertex_path, fragment_path) = (vertex_path.as_ref(), fragment_path.as_ref());
        let label = vertex_path
            .file_stem()
            .map_or_else(|| "shader".to_string(), |s| s.to_string_lossy().into_owned());

        let result = (|| {
            let preprocessor = Preprocessor::new(settings.include_dir.clone());
            let vertex = preprocessor.load_file(vertex_path)?;
            let fragment = preprocessor.load_file(fragment_path)?;
            Self::build(ctx, compile_program(&label, vertex, fragment)?)
        })();

        if let Err(err) = &result {
            log::error!(
                "Shader ({}, {}): {err}",
                vertex_path.display(),
                fragment_path.display()
            );
        }
        result
    }

    /// Compiles and links in-memory stage sources. `#include` lines resolve
    /// against `settings.include_dir`.
    pub fn from_source<D: GpuDevice>(
        ctx: &mut GpuContext<D>,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
        settings: &ShaderSettings,
    ) -> Result<Self> {
        let result = (|| {
            let preprocessor = Preprocessor::new(settings.include_dir.clone());
            let vertex = preprocessor.expand_source(vertex_source, label)?;
            let fragment = preprocessor.expand_source(fragment_source, label)?;
            Self::build(ctx, compile_program(label, vertex, fragment)?)
        })();

        if let Err(err) = &result {
            log::error!("Shader '{label}': {err}");
        }
        result
    }

    fn build<D: GpuDevice>(ctx: &mut GpuContext<D>, compiled: CompiledProgram) -> Result<Self> {
        let program = ctx.create_program(&compiled)?;
        let CompiledProgram {
            label,
            uniforms,
            vertex_inputs,
            samples_material_texture,
            ..
        } = compiled;
        let block = vec![0u8; uniforms.size() as usize];

        Ok(Self {
            label,
            program,
            layout: uniforms,
            vertex_inputs,
            samples_material_texture,
            uniforms: RwLock::new(block),
        })
    }

    // === Accessors ===

    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.program.id()
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Vertex input locations the program reads.
    #[inline]
    #[must_use]
    pub fn vertex_inputs(&self) -> &[u32] {
        &self.vertex_inputs
    }

    #[inline]
    #[must_use]
    pub fn samples_material_texture(&self) -> bool {
        self.samples_material_texture
    }

    /// Copy of the current uniform block.
    #[must_use]
    pub fn uniform_bytes(&self) -> Vec<u8> {
        self.uniforms.read().clone()
    }

    /// Makes this program active for subsequent draws recorded on `backend`.
    pub fn bind(&self, backend: &mut Backend) {
        backend.set_shader(self);
    }

    // === Uniforms ===

    /// Writes `bytes` at the named member if it exists with the expected kind.
    /// Unknown names and kind mismatches are ignored.
    fn write_uniform(&self, name: &str, kind: UniformKind, bytes: &[u8]) {
        let Some(member) = self.layout.get(name) else {
            log::trace!("Shader '{}' has no uniform '{name}'", self.label);
            return;
        };
        if member.kind != kind {
            log::trace!(
                "Shader '{}': uniform '{name}' is {:?}, not {kind:?}",
                self.label,
                member.kind
            );
            return;
        }
        let offset = member.offset as usize;
        self.uniforms.write()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn set_uniform_mat4(&self, name: &str, value: Mat4) {
        self.write_uniform(name, UniformKind::Mat4, bytemuck::bytes_of(&value.to_cols_array()));
    }

    pub fn set_uniform_vec4(&self, name: &str, value: Vec4) {
        self.write_uniform(name, UniformKind::Vec4, bytemuck::bytes_of(&value.to_array()));
    }

    pub fn set_uniform_vec2(&self, name: &str, value: Vec2) {
        self.write_uniform(name, UniformKind::Vec2, bytemuck::bytes_of(&value.to_array()));
    }

    /// Columns are padded to 16 bytes, as `mat3x3<f32>` is laid out in a
    /// uniform block.
    pub fn set_uniform_mat3(&self, name: &str, value: Mat3) {
        let mut columns = [0.0f32; 12];
        for (i, column) in value.to_cols_array_2d().iter().enumerate() {
            columns[i * 4..i * 4 + 3].copy_from_slice(column);
        }
        self.write_uniform(name, UniformKind::Mat3, bytemuck::bytes_of(&columns));
    }

    pub fn set_uniform_vec3(&self, name: &str, value: Vec3) {
        self.write_uniform(name, UniformKind::Vec3, bytemuck::bytes_of(&value.to_array()));
    }

    pub fn set_uniform_1f(&self, name: &str, value: f32) {
        self.write_uniform(name, UniformKind::Float, bytemuck::bytes_of(&value));
    }

    pub fn set_uniform_1i(&self, name: &str, value: i32) {
        self.write_uniform(name, UniformKind::Int, bytemuck::bytes_of(&value));
    }

    pub fn set_uniform_1u(&self, name: &str, value: u32) {
        self.write_uniform(name, UniformKind::UInt, bytemuck::bytes_of(&value));
    }
}
