use crate::Vec3;

/// Axis-aligned bounding box stored as two corners.
///
/// Unlike a box built for BVH traversal, this type never pads or reorders
/// its corners once constructed with [`Aabb::new`]: an inverted or
/// zero-volume box stays exactly as given so downstream consumers see the
/// same values the scene declared.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from raw corners, without reordering.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from a center point and full extent.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Grow the box to contain a point.
    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Extent along each axis (negative for inverted axes).
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// True when the box is inverted or has zero volume on some axis.
    pub fn is_degenerate(&self) -> bool {
        !self.min.cmplt(self.max).all()
    }

    /// Box that contains nothing; any point included replaces both corners.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };
}
