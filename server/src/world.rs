//! Scene snapshot for topology queries.
//!
//! This module is responsible for:
//! - Seeding the default scenery rows.
//! - Reading `tracked_block` rows into a shared [`BlockRegistry`].
//! - Building a per-tick Rapier query world from the registry plus cached scenery.
//!
//! Design notes
//! - Scenery is immutable: its definitions are converted once and cached with `OnceLock`.
//! - Blocks move, so their colliders are rebuilt from the rows on every tick.
//! - Determinism: rows are read into id-ordered maps; the shared builder inserts in id order.
//! - Nothing here steps a simulation. Physics runs on the reporting participant.

use crate::{
    schema::{tracked_block, world_static, WorldStatic},
    types::{ColliderShape, DbQuat, DbVec3},
};
use shared::{BlockQueryWorld, BlockRegistry, ColliderShapeDef, StackingSettings, WorldStaticDef};
use spacetimedb::{ReducerContext, Table};
use std::sync::OnceLock;

static WORLD_STATIC_DEFS: OnceLock<Vec<WorldStaticDef>> = OnceLock::new();

/// Replace scenery with a single floor plane at `y = 0`.
pub fn recreate_static_world(ctx: &ReducerContext) {
    for row in ctx.db.world_static().iter() {
        ctx.db.world_static().delete(row);
    }

    ctx.db.world_static().insert(WorldStatic {
        id: 0,
        translation: DbVec3::ZERO,
        rotation: DbQuat::IDENTITY,
        shape: ColliderShape::Plane(0.0),
    });
}

/// All tracked blocks with their current grab state.
pub fn load_registry(ctx: &ReducerContext) -> BlockRegistry {
    let mut registry = BlockRegistry::new();
    for row in ctx.db.tracked_block().iter() {
        registry.insert((&row).into());
    }
    registry
}

/// Query world for this tick: every tracked block plus scenery.
pub fn build_query_world(
    ctx: &ReducerContext,
    registry: &BlockRegistry,
    settings: &StackingSettings,
) -> BlockQueryWorld {
    let statics = WORLD_STATIC_DEFS
        .get_or_init(|| ctx.db.world_static().iter().map(row_to_def).collect())
        .clone();
    BlockQueryWorld::build(registry.iter(), statics, settings.max_sweep_hits)
}

fn row_to_def(row: WorldStatic) -> WorldStaticDef {
    let shape = match row.shape {
        ColliderShape::Plane(offset_along_normal) => ColliderShapeDef::Plane {
            offset_along_normal,
        },
        ColliderShape::Cuboid(he) => ColliderShapeDef::Cuboid {
            half_extents: he.into(),
        },
    };

    WorldStaticDef {
        id: row.id,
        translation: row.translation.into(),
        rotation: row.rotation.into(),
        shape,
    }
}
