// Re-export glam for convenience
pub use glam::*;

// Echotrace math types
mod aabb;
mod camera;
mod transform;

pub use aabb::Aabb;
pub use camera::{Camera, FlyController, MoveInput};
pub use transform::Mat4Ext;
