use glam::{DVec3, IVec3};

use crate::block_of;

/// Axis-aligned bounding box in world space.
///
/// Double precision because vehicle worlds are large and entity positions
/// accumulate far from the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: DVec3,
    /// Maximum corner of the bounding box
    pub max: DVec3,
}

impl Aabb {
    /// Create a new AABB from min and max corners
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// AABB of the unit cube centered at `center`
    pub fn unit_cube(center: DVec3) -> Self {
        Self {
            min: center - DVec3::splat(0.5),
            max: center + DVec3::splat(0.5),
        }
    }

    /// Size along each axis
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Test intersection with another AABB (touching counts as intersecting)
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.max.x >= other.min.x
            && self.min.x <= other.max.x
            && self.max.y >= other.min.y
            && self.min.y <= other.max.y
            && self.max.z >= other.min.z
            && self.min.z <= other.max.z
    }
}

/// Integer block cuboid spanning `[min, max)` on every axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntCuboid {
    pub min: IVec3,
    pub max: IVec3,
}

impl IntCuboid {
    pub fn new(min: IVec3, max: IVec3) -> Self {
        Self { min, max }
    }

    /// Smallest block cuboid containing the world-space box `[min, max]`.
    pub fn enclosing(min: DVec3, max: DVec3) -> Self {
        Self {
            min: IVec3::new(block_of(min.x), block_of(min.y), block_of(min.z)),
            max: IVec3::new(block_of(max.x), block_of(max.y), block_of(max.z)) + IVec3::ONE,
        }
    }

    /// Whether the cuboid contains no blocks
    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y || self.min.z >= self.max.z
    }

    /// Intersection with another cuboid. The result may be empty.
    pub fn clamped_to(&self, other: &IntCuboid) -> Self {
        Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    /// Cube of blocks within `radius` blocks of `center_block` on every axis
    pub fn around(center_block: IVec3, radius: i32) -> Self {
        Self {
            min: center_block - IVec3::splat(radius),
            max: center_block + IVec3::splat(radius + 1),
        }
    }
}
