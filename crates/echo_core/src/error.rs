//! Error types for scene management.

use thiserror::Error;

/// Errors raised while building or reading the scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene description parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid scene description: {0}")]
    InvalidDescription(String),

    #[error("Unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u64 },

    /// The registry changed composition after the collection was taken.
    #[error("Stale collection: collected at revision {collected}, registry is at {current}")]
    StaleCollection { collected: u64, current: u64 },
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
