//! Plain primitive descriptors rebuilt every frame from live scene state.
//!
//! These records carry no GPU resources; the render crate converts them
//! into its packed buffer layout.

use echo_math::{Aabb, Vec3};

/// Acoustic/optical surface response of a box.
///
/// All four factors are expected to lie in [0, 1] but are not clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Fraction of incoming energy absorbed by the surface
    pub absorption: f32,

    /// Fraction of energy passing through the volume
    pub transmission: f32,

    /// Surface roughness (0=mirror, 1=fully diffuse)
    pub roughness: f32,

    /// Volume scattering factor
    pub scatter: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            absorption: 0.4,
            transmission: 0.2,
            roughness: 0.5,
            scatter: 0.3,
        }
    }
}

impl Material {
    pub fn new(absorption: f32, transmission: f32, roughness: f32, scatter: f32) -> Self {
        Self {
            absorption,
            transmission,
            roughness,
            scatter,
        }
    }

    /// True when every factor lies in [0, 1].
    pub fn is_normalized(&self) -> bool {
        [self.absorption, self.transmission, self.roughness, self.scatter]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

/// World-space axis-aligned box with its material.
///
/// `min <= max` per axis is expected; inverted bounds are passed through
/// unchanged and the kernel treats them as never hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxPrimitive {
    pub min: Vec3,
    pub max: Vec3,
    pub material: Material,
}

impl BoxPrimitive {
    pub fn new(bounds: Aabb, material: Material) -> Self {
        Self {
            min: bounds.min,
            max: bounds.max,
            material,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.min, self.max)
    }
}

/// Point emitter with a linear-RGB color and scalar intensity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourcePrimitive {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}
