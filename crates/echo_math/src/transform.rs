// Transform utilities for Mat4
//
// Extends glam::Mat4 with the helpers the scene layer needs to turn local
// renderable bounds and entity transforms into world-space values.

use glam::{Mat4, Vec3};
use crate::Aabb;

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// World-space position of the local origin (the translation column).
    fn origin(&self) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        let (lo, hi) = (aabb.min, aabb.max);

        let corners = [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ];

        let mut result = Aabb::EMPTY;
        for corner in corners {
            result.include_point(self.transform_point3(corner));
        }
        result
    }

    fn origin(&self) -> Vec3 {
        self.w_axis.truncate()
    }
}
