//! Compute dispatch sizing.

/// Work-items per group along each axis; must match `@workgroup_size` in the kernel.
pub const WORKGROUP_SIZE: u32 = 8;

/// Number of workgroups needed to cover an output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGroups {
    pub x: u32,
    pub y: u32,
}

impl DispatchGroups {
    /// Ceiling division so partial tiles at the right/bottom edge are covered.
    ///
    /// The kernel bounds-checks against the resolution for the overhang.
    pub fn for_resolution(width: u32, height: u32) -> Self {
        Self {
            x: width.div_ceil(WORKGROUP_SIZE),
            y: height.div_ceil(WORKGROUP_SIZE),
        }
    }

    /// True when there is nothing to dispatch.
    pub fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0
    }
}
