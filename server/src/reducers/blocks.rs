//! Physics sample ingress.
//!
//! The server never simulates. The participant that owns physics registers every block once
//! and streams pose and speed samples afterward; the topology tick reads whatever was last
//! reported.

use crate::{schema::*, types::*};
use spacetimedb::{ReducerContext, Table};

/// Start tracking a block, or refresh its pose if `name` is already tracked.
///
/// Grab state and the stacked flag survive a refresh.
#[spacetimedb::reducer]
pub fn register_block(
    ctx: &ReducerContext,
    name: String,
    translation: DbVec3,
    rotation: DbQuat,
    half_extents: DbVec3,
    stackable: bool,
) -> Result<(), String> {
    let he = [half_extents.x, half_extents.y, half_extents.z];
    if he.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return Err(format!("Block `{name}` needs positive half extents"));
    }

    if let Some(existing) = ctx.db.tracked_block().name().find(&name) {
        ctx.db.tracked_block().id().update(TrackedBlockRow {
            translation,
            rotation,
            half_extents,
            stackable,
            ..existing
        });
        return Ok(());
    }

    let row = ctx.db.tracked_block().insert(TrackedBlockRow {
        id: 0,
        name,
        translation,
        rotation,
        half_extents,
        linear_speed: 0.0,
        held_by: None,
        stackable,
        stacked: false,
    });
    log::debug!("Tracking block {} ({})", row.id, row.name);
    Ok(())
}

/// Latest physics sample for one block.
#[spacetimedb::reducer]
pub fn report_block_motion(
    ctx: &ReducerContext,
    block_id: u64,
    translation: DbVec3,
    rotation: DbQuat,
    linear_speed: f32,
) -> Result<(), String> {
    let Some(row) = ctx.db.tracked_block().id().find(block_id) else {
        return Err(format!("Block {block_id} is not tracked"));
    };

    ctx.db.tracked_block().id().update(TrackedBlockRow {
        translation,
        rotation,
        linear_speed: linear_speed.abs(),
        ..row
    });
    Ok(())
}
