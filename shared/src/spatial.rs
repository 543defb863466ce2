//! Spatial query adapter contract.
//!
//! The physics backend is an external collaborator. The topology engine and the stacking zone
//! only see it through [`SpatialQuery`]: read-only box sweeps, box overlaps and collider bounds.
//!
//! Notes:
//! - Zero hits is "nothing found", never an error.
//! - A block with no bounds (no collider, no shape) is treated as not eligible by callers.

use crate::{
    tag::LayerMask,
    types::{BlockId, Vec3},
};

/// One block touched by a sweep.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SweepHit {
    pub block: BlockId,
    /// World-space contact point on the hit collider.
    pub point: Vec3,
    /// Distance travelled along the sweep direction before contact (meters).
    pub distance: f32,
}

/// Axis-aligned world-space bounds of a collider.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Bounds {
    pub fn center(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.maxs - self.mins) * 0.5
    }

    pub fn height(&self) -> f32 {
        self.maxs.y - self.mins.y
    }
}

/// Read-only scene queries against the movable-block layer.
pub trait SpatialQuery {
    /// Sweep an axis-aligned box of `half_extents` from `origin` along unit `direction` for up
    /// to `max_distance`.
    ///
    /// Returns every block on `layers` touched by the sweep, ordered by distance (ties by id).
    fn sweep_test(
        &self,
        origin: Vec3,
        half_extents: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Vec<SweepHit>;

    /// Blocks on `layers` whose colliders overlap the box at `center`, ordered by id.
    fn overlap_test(&self, center: Vec3, half_extents: Vec3, layers: LayerMask) -> Vec<BlockId>;

    /// World-space bounds of a block's collider, or `None` when the backend has no shape for it.
    fn bounds(&self, block: BlockId) -> Option<Bounds>;
}

/// Sort hits by distance, then id, so equal-distance hits resolve deterministically.
pub fn sort_hits(hits: &mut [SweepHit]) {
    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.block.cmp(&b.block))
    });
}
