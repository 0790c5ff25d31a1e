/// Game object state and axis-aligned bounds
///
/// The world uses a y-down convention: the floor plane sits at a positive
/// y value below the objects, gravity accelerates toward +y, and an upward
/// jump impulse is negative y.

use glam::Vec3;


/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box of the given half extents centered on `position`
    pub fn centered(position: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: position - half_extents,
            max: position + half_extents,
        }
    }

    /// Overlap test on the x and y axes only.
    ///
    /// The demo scene is effectively planar: every object shares one depth,
    /// so collision resolution separates on the two screen axes.
    pub fn overlaps_xy(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Lowest edge of the box (largest y in the y-down convention)
    pub fn bottom(&self) -> f32 {
        self.max.y
    }
}

/// One simulated object: position, velocity, and its collision extents
#[derive(Debug, Clone)]
pub struct GameObject {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Half extents of the bounding box around `position`
    pub half_extents: Vec3,
    /// True if any movement candidate was blocked on the last step
    pub collided: bool,
}

impl GameObject {
    pub fn new(position: Vec3, half_extents: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            half_extents,
            collided: false,
        }
    }

    /// Bounding box at the current position.
    ///
    /// Recomputed from scratch on every call, so it always reflects the
    /// latest position.
    pub fn aabb(&self) -> Aabb {
        Aabb::centered(self.position, self.half_extents)
    }

    /// Bounding box the object would occupy after `displacement`
    pub fn aabb_displaced(&self, displacement: Vec3) -> Aabb {
        Aabb::centered(self.position + displacement, self.half_extents)
    }
}
