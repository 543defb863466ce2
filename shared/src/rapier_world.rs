//! Rapier-backed spatial query adapter over a per-tick block snapshot.
//!
//! This module is intended to be used by the host (native or SpacetimeDB module) to build an
//! in-memory Rapier collider set from the tracked blocks, plus optional static scenery, and run
//! the sweeps/overlaps the topology engine needs.
//!
//! Design goals
//! - Snapshot: blocks move, so the world is rebuilt from tracked state every tick instead of
//!   being cached. Nothing here steps a simulation.
//! - Deterministic: colliders are inserted in block-id order and hits are sorted by distance,
//!   then id.
//! - Layered: each collider carries a packed [`crate::tag::ColliderTag`] in `user_data`; static
//!   scenery carries none and is invisible to layer-filtered queries.

// Re-export Rapier so the server can name Rapier types without its own `rapier3d` import.
pub use rapier3d;

use crate::{
    block::{BlockRegistry, TrackedBlock},
    spatial::{sort_hits, Bounds, SpatialQuery, SweepHit},
    tag::{pack_tag, tagged_block, LayerMask},
    types::{BlockId, Iso, Vec3},
};
use rapier3d::{
    na::{Translation3, UnitQuaternion},
    parry::{
        query::{self, ShapeCastOptions},
        shape::{Cuboid, Shape},
    },
    prelude::*,
};
use std::collections::BTreeMap;

/// Canonical, schema-agnostic definition of immutable scenery (floor, table, walls).
#[derive(Clone, Debug)]
pub struct WorldStaticDef {
    /// Stable unique identifier used to ensure deterministic insertion order.
    pub id: u32,
    /// World-space translation.
    pub translation: Vector<f32>,
    /// World-space rotation (unit quaternion).
    pub rotation: UnitQuaternion<f32>,
    /// Collider shape parameters.
    pub shape: ColliderShapeDef,
}

/// Supported scenery shapes.
#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Infinite plane (half-space).
    ///
    /// The plane normal is derived from the pose as `rotation * +Y`.
    Plane {
        /// Offset along the plane normal (meters).
        offset_along_normal: f32,
    },

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vector<f32> },
}

/// Rapier colliders for one tick's block snapshot.
pub struct BlockQueryWorld {
    colliders: ColliderSet,
    blocks: BTreeMap<BlockId, ColliderHandle>,
    max_sweep_hits: usize,
}

impl BlockQueryWorld {
    /// Build a query world from tracked blocks and static scenery.
    ///
    /// Blocks with degenerate extents or non-finite poses get no collider, so their bounds
    /// query fails and the engine skips them for this tick.
    pub fn build<'a>(
        blocks: impl IntoIterator<Item = &'a TrackedBlock>,
        mut statics: Vec<WorldStaticDef>,
        max_sweep_hits: usize,
    ) -> Self {
        let mut colliders = ColliderSet::new();
        let mut handles = BTreeMap::new();

        let mut blocks: Vec<&TrackedBlock> = blocks.into_iter().collect();
        blocks.sort_by_key(|b| b.id);

        for block in blocks {
            let Some(collider) = block_collider(block) else {
                log::debug!("Block {} has no usable shape; skipped this tick", block.id);
                continue;
            };
            handles.insert(block.id, colliders.insert(collider));
        }

        statics.sort_by_key(|d| d.id);
        for def in statics.iter() {
            colliders.insert(static_collider(def));
        }

        Self {
            colliders,
            blocks: handles,
            max_sweep_hits,
        }
    }

    /// Snapshot every block in `registry`, without scenery.
    pub fn from_registry(registry: &BlockRegistry, max_sweep_hits: usize) -> Self {
        Self::build(registry.iter(), Vec::new(), max_sweep_hits)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn layered_colliders(&self, layers: LayerMask) -> impl Iterator<Item = (BlockId, &Collider)> {
        self.colliders
            .iter()
            .filter_map(move |(_, co)| tagged_block(co.user_data, layers).map(|id| (id, co)))
    }
}

impl SpatialQuery for BlockQueryWorld {
    fn sweep_test(
        &self,
        origin: Vec3,
        half_extents: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Vec<SweepHit> {
        if max_distance <= 0.0 || direction.norm_squared() <= 1.0e-12 {
            return Vec::new();
        }
        let direction = direction.normalize();
        let sweep_shape = Cuboid::new(half_extents);
        let sweep_iso = Iso::translation(origin.x, origin.y, origin.z);

        let mut opts = ShapeCastOptions::with_max_time_of_impact(max_distance);
        opts.stop_at_penetration = true;

        let mut hits: Vec<SweepHit> = self
            .layered_colliders(layers)
            .filter_map(|(id, co)| {
                let hit = query::cast_shapes(
                    &sweep_iso,
                    &direction,
                    &sweep_shape as &dyn Shape,
                    co.position(),
                    &Vector::zeros(),
                    co.shape(),
                    opts,
                )
                .ok()??;

                let point = co.position().transform_point(&hit.witness2);
                Some(SweepHit {
                    block: id,
                    point: point.coords,
                    distance: hit.time_of_impact,
                })
            })
            .collect();

        sort_hits(&mut hits);
        hits.truncate(self.max_sweep_hits);
        hits
    }

    fn overlap_test(&self, center: Vec3, half_extents: Vec3, layers: LayerMask) -> Vec<BlockId> {
        let probe = Cuboid::new(half_extents);
        let probe_iso = Iso::translation(center.x, center.y, center.z);

        // `layered_colliders` iterates the arena, not id order.
        let mut ids: Vec<BlockId> = self
            .layered_colliders(layers)
            .filter(|(_, co)| {
                query::intersection_test(&probe_iso, &probe as &dyn Shape, co.position(), co.shape())
                    .unwrap_or(false)
            })
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn bounds(&self, block: BlockId) -> Option<Bounds> {
        let handle = self.blocks.get(&block)?;
        let aabb = self.colliders.get(*handle)?.compute_aabb();
        Some(Bounds {
            mins: aabb.mins.coords,
            maxs: aabb.maxs.coords,
        })
    }
}

fn block_collider(block: &TrackedBlock) -> Option<Collider> {
    let he = block.half_extents;
    let finite = block.position.iter().chain(he.iter()).all(|v| v.is_finite());
    if !finite || he.min() <= 0.0 {
        return None;
    }

    let layers = if block.stackable {
        LayerMask::BLOCKS
    } else {
        LayerMask::NONE
    };
    let iso = Isometry::from_parts(Translation3::from(block.position), block.rotation);

    Some(
        ColliderBuilder::cuboid(he.x, he.y, he.z)
            .position(iso)
            .user_data(pack_tag(block.id, layers))
            .build(),
    )
}

/// Build scenery from a `WorldStaticDef`. Scenery carries a zero tag.
fn static_collider(def: &WorldStaticDef) -> Collider {
    match &def.shape {
        ColliderShapeDef::Plane {
            offset_along_normal,
        } => {
            // n = R * +Y, dist = n ⋅ t + offset.
            let n = def.rotation * Vector::y();
            let dist = n.dot(&def.translation) + *offset_along_normal;
            let unit_n = UnitVector::new_normalize(n);

            ColliderBuilder::new(SharedShape::new(HalfSpace::new(unit_n)))
                .translation(unit_n.into_inner() * dist)
                .build()
        }

        ColliderShapeDef::Cuboid { half_extents } => {
            let iso = Isometry::from_parts(Translation3::from(def.translation), def.rotation);
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
                .position(iso)
                .build()
        }
    }
}
