//! Echotrace Core - scene model for the audio ray-marching pipeline.
//!
//! This crate provides:
//!
//! - **Primitive descriptors**: `Material`, `BoxPrimitive`, `SourcePrimitive`
//! - **Scene registry**: explicit registration of boxes and sound sources,
//!   ordered collection, and per-frame snapshots with drift detection
//! - **Spectrum signal**: mapping of audio spectrum content to a source color
//! - **Scene descriptions**: serde-backed JSON scene files
//!
//! # Example
//!
//! ```ignore
//! use echo_core::{Material, SceneBox, SceneRegistry, SceneSource};
//!
//! let mut registry = SceneRegistry::new();
//! registry.register_box(SceneBox::from_world_bounds(bounds, Material::default()));
//! let source = registry.register_source(SceneSource::at(Vec3::Y));
//!
//! let collection = registry.collect();
//! let snapshot = registry.snapshot(&collection)?;
//! ```

pub mod config;
pub mod error;
pub mod primitive;
pub mod registry;
pub mod spectrum;

// Re-export commonly used types
pub use config::{BoxDescription, MaterialDescription, SceneDescription, SourceDescription};
pub use error::{SceneError, SceneResult};
pub use primitive::{BoxPrimitive, Material, SourcePrimitive};
pub use registry::{
    BoxHandle, Collection, FrameSnapshot, SceneBox, SceneRegistry, SceneSource, SourceHandle,
};
pub use spectrum::{ColorMode, SourceSignal, SpectrumColorizer};
