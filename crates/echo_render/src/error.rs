//! Error types for the render pipeline

use echo_core::SceneError;
use thiserror::Error;

/// Which packed buffer an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Boxes,
    Sources,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Boxes => write!(f, "boxes"),
            RecordKind::Sources => write!(f, "sources"),
        }
    }
}

/// Render pipeline errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// No adapter or device could be created
    #[error("GPU initialization failed: {0}")]
    GpuInit(String),

    #[error("Device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// Kernel source failed validation
    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// Device memory exhausted while allocating a buffer
    #[error("Out of device memory allocating '{label}' ({size} bytes)")]
    OutOfMemory { label: String, size: u64 },

    /// Requested buffer exceeds the device binding limit
    #[error("Buffer '{label}' too large: {size} bytes (limit {limit})")]
    BufferTooLarge { label: String, size: u64, limit: u64 },

    /// Repack attempted before allocation or after release
    #[error("Scene buffers are not allocated")]
    NotAllocated,

    /// Scene composition no longer matches the allocated buffers
    #[error("{kind} count mismatch: buffers hold {allocated}, scene has {current}")]
    CountMismatch {
        kind: RecordKind,
        allocated: usize,
        current: usize,
    },

    /// The device rejected a resource description
    #[error("Device validation failed: {0}")]
    DeviceValidation(String),

    /// Mapping the result for CPU readback failed
    #[error("Readback failed: {0}")]
    Readback(String),

    /// Input frame cannot be processed
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl RenderError {
    /// Errors after which the pipeline instance must be torn down.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RenderError::OutOfMemory { .. } | RenderError::BufferTooLarge { .. }
        )
    }
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;
