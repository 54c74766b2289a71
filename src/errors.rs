//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`KilnError`] covers the *recoverable* failure modes:
//! - GPU initialization failures
//! - Asset loading and decoding errors (images, glTF)
//! - Shader compilation and linking errors
//! - Configuration errors
//!
//! Programming errors (out-of-range texture handles, short pixel buffers,
//! missing GPU context) are not represented here: they panic.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, KilnError>`.
//!
//! ```rust,ignore
//! use kiln::errors::{KilnError, Result};
//!
//! fn load_asset() -> Result<()> {
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage a shader diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// The main error type for the Kiln engine.
#[derive(Error, Debug)]
pub enum KilnError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// A GPU operation (readback, polling) failed after device creation.
    #[error("GPU operation failed: {0}")]
    GpuOperationFailed(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // ========================================================================
    // Image & Texture Errors
    // ========================================================================
    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecodeError(String),

    /// Cube map validation error.
    #[error("Cube map error: {0}")]
    CubeMapError(String),

    // ========================================================================
    // Model Errors
    // ========================================================================
    /// glTF parsing or loading error.
    #[error("glTF error: {0}")]
    GltfError(String),

    /// The model file extension is not handled by any loader.
    #[error("Unsupported model format: {}", .0.display())]
    UnsupportedModelFormat(PathBuf),

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// An `#include` directive could not be resolved.
    #[error("Shader include error in {}: {message}", .file.display())]
    ShaderIncludeError {
        /// File containing the directive
        file: PathBuf,
        /// What went wrong
        message: String,
    },

    /// A single stage failed to parse or validate.
    #[error("Failed to compile {stage} shader '{label}':\n{message}")]
    ShaderCompileError {
        /// Which stage failed
        stage: ShaderStage,
        /// Program label
        label: String,
        /// Compiler diagnostic
        message: String,
    },

    /// Both stages compiled but do not form a valid program.
    #[error("Failed to link shader '{label}': {message}")]
    ShaderLinkError {
        /// Program label
        label: String,
        /// Linker diagnostic
        message: String,
    },

    // ========================================================================
    // Format & Parsing Errors
    // ========================================================================
    /// JSON parsing error (settings files).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for KilnError {
    fn from(err: image::ImageError) -> Self {
        KilnError::ImageDecodeError(err.to_string())
    }
}

impl From<gltf::Error> for KilnError {
    fn from(err: gltf::Error) -> Self {
        KilnError::GltfError(err.to_string())
    }
}

/// Alias for `Result<T, KilnError>`.
pub type Result<T> = std::result::Result<T, KilnError>;
