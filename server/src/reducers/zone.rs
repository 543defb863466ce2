//! Stacking zone management.
//!
//! The zone is the optional single row `stacking_zone` (`id = ZONE_ID`). While it exists, the
//! topology tick only counts blocks overlapping it. Membership itself is re-derived every tick.

use crate::{schema::*, types::DbVec3, utils::ZONE_ID};
use shared::StackingZone;
use spacetimedb::{ReducerContext, Table};

/// Create or move the stacking zone.
#[spacetimedb::reducer]
pub fn set_stacking_zone(
    ctx: &ReducerContext,
    center: DbVec3,
    half_extents: DbVec3,
) -> Result<(), String> {
    StackingZone::try_new(center.into(), half_extents.into()).map_err(|e| e.to_string())?;

    let row = StackingZoneRow {
        id: ZONE_ID,
        center,
        half_extents,
    };
    if ctx.db.stacking_zone().id().find(ZONE_ID).is_some() {
        ctx.db.stacking_zone().id().update(row);
    } else {
        ctx.db.stacking_zone().insert(row);
    }
    log::info!(
        "Stacking zone at ({}, {}, {}) half extents ({}, {}, {})",
        center.x,
        center.y,
        center.z,
        half_extents.x,
        half_extents.y,
        half_extents.z
    );
    Ok(())
}

/// Remove the zone so every block counts again.
#[spacetimedb::reducer]
pub fn clear_stacking_zone(ctx: &ReducerContext) -> Result<(), String> {
    if ctx.db.stacking_zone().id().delete(ZONE_ID) {
        log::info!("Stacking zone cleared");
    }
    Ok(())
}
