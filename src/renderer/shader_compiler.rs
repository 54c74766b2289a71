//! Shader Compiler
//!
//! Turns a pair of WGSL stage sources into a [`CompiledProgram`]:
//!
//! 1. **Preprocess**: `#include "file"` / `#include <file>` lines are replaced
//!    by the file's contents. Each file is pasted at most once per stage and
//!    include cycles are rejected.
//! 2. **Compile**: each stage is parsed and validated on its own with `naga`,
//!    against the baseline capabilities every device provides. Programs
//!    that need optional features (`enable f16;`, push constants, ...) are
//!    rejected here.
//! 3. **Link**: the vertex stage must have a vertex entry point and the
//!    fragment stage a fragment entry point; every fragment input location
//!    must be written by the vertex stage; the uniform blocks both stages
//!    declare at `@group(0) @binding(0)` must agree on shared members.
//!
//! The merged uniform block is reflected into a [`UniformLayout`] so uniform
//! values can be written by name.

use std::path::{Path, PathBuf};

use naga::valid::{Capabilities, ValidationFlags, Validator};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{KilnError, Result, ShaderStage};

/// Bind group holding the program's uniform block.
pub const UNIFORM_GROUP: u32 = 0;
/// Bind group holding the material texture and its sampler.
pub const MATERIAL_GROUP: u32 = 1;

// ============================================================================
// Reflection types
// ============================================================================

/// Shader-side type of a uniform block member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Int,
    UInt,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    /// Anything the setters cannot write (arrays, nested structs, ...).
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformMember {
    /// Byte offset inside the block.
    pub offset: u32,
    pub kind: UniformKind,
}

/// Name → (offset, kind) map of a program's uniform block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformLayout {
    members: FxHashMap<String, UniformMember>,
    size: u32,
}

impl UniformLayout {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<UniformMember> {
        self.members.get(name).copied()
    }

    /// Block size in bytes, rounded up to 16.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }
}

/// Preprocessed, validated source of one stage.
#[derive(Debug, Clone)]
pub struct StageSource {
    pub source: String,
    pub entry_point: String,
}

/// A linked program ready to hand to a [`GpuDevice`](super::device::GpuDevice).
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub label: String,
    pub vertex: StageSource,
    pub fragment: StageSource,
    pub uniforms: UniformLayout,
    /// Vertex input locations the vertex entry point reads.
    pub vertex_inputs: Vec<u32>,
    /// Whether either stage samples the material texture (group 1).
    pub samples_material_texture: bool,
}

// ============================================================================
// Preprocessing
// ============================================================================

/// Resolves `#include` directives.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    include_dir: Option<PathBuf>,
}

impl Preprocessor {
    #[must_use]
    pub fn new(include_dir: Option<PathBuf>) -> Self {
        Self { include_dir }
    }

    /// Reads `path` and expands its includes.
    pub fn load_file(&self, path: &Path) -> Result<String> {
        let source = std::fs::read_to_string(path)?;
        let mut seen = FxHashSet::default();
        let mut stack = vec![canonical(path)];
        seen.insert(canonical(path));
        self.expand(&source, path.parent(), path, &mut seen, &mut stack)
    }

    /// Expands includes of in-memory source. Relative includes resolve
    /// against the include directory, then the working directory.
    pub fn expand_source(&self, source: &str, origin: &str) -> Result<String> {
        let mut seen = FxHashSet::default();
        let mut stack = Vec::new();
        self.expand(source, None, Path::new(origin), &mut seen, &mut stack)
    }

    fn expand(
        &self,
        source: &str,
        file_dir: Option<&Path>,
        file: &Path,
        seen: &mut FxHashSet<PathBuf>,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String> {
        let mut out = String::with_capacity(source.len());

        for line in source.lines() {
            let Some(target) = parse_include(line) else {
                out.push_str(line);
                out.push('\n');
                continue;
            };

            let path = self.resolve(target, file_dir);
            let key = canonical(&path);

            if stack.contains(&key) {
                return Err(KilnError::ShaderIncludeError {
                    file: file.to_path_buf(),
                    message: format!("include cycle through '{target}'"),
                });
            }
            if !seen.insert(key.clone()) {
                continue;
            }

            let included = std::fs::read_to_string(&path).map_err(|e| {
                KilnError::ShaderIncludeError {
                    file: file.to_path_buf(),
                    message: format!("cannot read '{}': {e}", path.display()),
                }
            })?;

            stack.push(key);
            let expanded = self.expand(&included, path.parent(), &path, seen, stack)?;
            stack.pop();
            out.push_str(&expanded);
        }

        Ok(out)
    }

    fn resolve(&self, target: &str, file_dir: Option<&Path>) -> PathBuf {
        match (&self.include_dir, file_dir) {
            (Some(dir), _) => dir.join(target),
            (None, Some(dir)) => dir.join(target),
            (None, None) => PathBuf::from(target),
        }
    }
}

fn parse_include(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#include")?.trim();
    let inner = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('<').and_then(|r| r.strip_suffix('>')))?;
    (!inner.is_empty()).then_some(inner)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

// ============================================================================
// Compilation
// ============================================================================

/// Result of compiling one stage.
struct CompiledStage {
    entry_point: String,
    uniforms: Option<UniformLayout>,
    inputs: Vec<u32>,
    outputs: Vec<u32>,
    samples_material_texture: bool,
}

fn compile_stage(source: &str, stage: ShaderStage, label: &str) -> Result<CompiledStage> {
    let compile_error = |message: String| KilnError::ShaderCompileError {
        stage,
        label: label.to_string(),
        message,
    };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;

    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let Some(entry) = module.entry_points.iter().find(|ep| ep.stage == wanted) else {
        return Err(KilnError::ShaderLinkError {
            label: label.to_string(),
            message: format!("{stage} source has no @{stage} entry point"),
        });
    };

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        collect_locations(&module, arg.ty, arg.binding.as_ref(), &mut inputs);
    }
    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        collect_locations(&module, result.ty, result.binding.as_ref(), &mut outputs);
    }

    let mut uniforms = None;
    let mut samples_material_texture = false;
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else { continue };
        if var.space == naga::AddressSpace::Uniform
            && binding.group == UNIFORM_GROUP
            && binding.binding == 0
        {
            uniforms = Some(reflect_uniforms(&module, var));
        }
        if binding.group == MATERIAL_GROUP
            && binding.binding == 0
            && matches!(module.types[var.ty].inner, naga::TypeInner::Image { .. })
        {
            samples_material_texture = true;
        }
    }

    Ok(CompiledStage {
        entry_point: entry.name.clone(),
        uniforms,
        inputs,
        outputs,
        samples_material_texture,
    })
}

fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => out.push(*location),
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn reflect_uniforms(module: &naga::Module, var: &naga::GlobalVariable) -> UniformLayout {
    let ty = &module.types[var.ty];
    let mut members = FxHashMap::default();

    let size = if let naga::TypeInner::Struct { members: fields, span } = &ty.inner {
        for field in fields {
            if let Some(name) = &field.name {
                let kind = uniform_kind(&module.types[field.ty].inner);
                members.insert(name.clone(), UniformMember { offset: field.offset, kind });
            }
        }
        *span
    } else {
        // A bare `var<uniform> name: T` is a single-member block.
        if let Some(name) = &var.name {
            let kind = uniform_kind(&ty.inner);
            members.insert(name.clone(), UniformMember { offset: 0, kind });
        }
        ty.inner.size(module.to_ctx())
    };

    UniformLayout {
        members,
        size: size.next_multiple_of(16),
    }
}

fn uniform_kind(inner: &naga::TypeInner) -> UniformKind {
    use naga::{ScalarKind, TypeInner, VectorSize};

    match inner {
        TypeInner::Scalar(scalar) if scalar.width == 4 => match scalar.kind {
            ScalarKind::Float => UniformKind::Float,
            ScalarKind::Sint => UniformKind::Int,
            ScalarKind::Uint => UniformKind::UInt,
            _ => UniformKind::Other,
        },
        TypeInner::Vector { size, scalar }
            if scalar.kind == ScalarKind::Float && scalar.width == 4 =>
        {
            match size {
                VectorSize::Bi => UniformKind::Vec2,
                VectorSize::Tri => UniformKind::Vec3,
                VectorSize::Quad => UniformKind::Vec4,
            }
        }
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.width == 4 => UniformKind::Mat4,
        TypeInner::Matrix {
            columns: VectorSize::Tri,
            rows: VectorSize::Tri,
            scalar,
        } if scalar.width == 4 => UniformKind::Mat3,
        _ => UniformKind::Other,
    }
}

// ============================================================================
// Linking
// ============================================================================

fn link(label: &str, vertex: CompiledStage, fragment: CompiledStage) -> Result<(UniformLayout, CompiledStage, CompiledStage)> {
    let link_error = |message: String| KilnError::ShaderLinkError {
        label: label.to_string(),
        message,
    };

    if let Some(missing) = fragment.inputs.iter().find(|loc| !vertex.outputs.contains(loc)) {
        return Err(link_error(format!(
            "fragment input @location({missing}) is not written by the vertex stage"
        )));
    }

    let mut merged = vertex.uniforms.clone().unwrap_or_default();
    if let Some(frag) = &fragment.uniforms {
        for (name, member) in &frag.members {
            match merged.members.get(name) {
                Some(existing) if existing != member => {
                    return Err(link_error(format!(
                        "uniform '{name}' differs between stages ({existing:?} vs {member:?})"
                    )));
                }
                Some(_) => {}
                None => {
                    merged.members.insert(name.clone(), *member);
                }
            }
        }
        merged.size = merged.size.max(frag.size);
    }

    Ok((merged, vertex, fragment))
}

/// Compiles and links two in-memory stage sources (includes already expanded).
pub fn compile_program(label: &str, vertex_source: String, fragment_source: String) -> Result<CompiledProgram> {
    let vertex = compile_stage(&vertex_source, ShaderStage::Vertex, label)?;
    let fragment = compile_stage(&fragment_source, ShaderStage::Fragment, label)?;
    let (uniforms, vertex, fragment) = link(label, vertex, fragment)?;

    let mut vertex_inputs = vertex.inputs;
    vertex_inputs.sort_unstable();
    vertex_inputs.dedup();

    log::debug!(
        "Linked shader '{}' ({} uniforms, {} bytes)",
        label,
        uniforms.members.len(),
        uniforms.size
    );

    Ok(CompiledProgram {
        label: label.to_string(),
        vertex: StageSource {
            source: vertex_source,
            entry_point: vertex.entry_point,
        },
        fragment: StageSource {
            source: fragment_source,
            entry_point: fragment.entry_point,
        },
        uniforms,
        vertex_inputs,
        samples_material_texture: vertex.samples_material_texture || fragment.samples_material_texture,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_include_forms() {
        assert_eq!(parse_include("#include \"common.wgsl\""), Some("common.wgsl"));
        assert_eq!(parse_include("  #include <lib/util.wgsl>"), Some("lib/util.wgsl"));
        assert_eq!(parse_include("#include"), None);
        assert_eq!(parse_include("// #include \"x\""), None);
        assert_eq!(parse_include("let x = 1;"), None);
    }
}
