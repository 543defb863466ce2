//! Topology tick.
//!
//! This file contains:
//! - `TopologyTickTimer` scheduled table
//! - `init(ctx)` to schedule the tick at the configured check interval
//! - `topology_tick_reducer`, which recomputes tower topology and publishes the score
//!
//! Notes:
//! - Topology is rebuilt from the rows every tick. Nothing carries over, so a tick that finds a
//!   block without a usable shape just skips it.
//! - `stacked` flags are written only when they change, and the score row only when the value
//!   changes, to keep subscriber traffic down to real transitions.

use crate::{
    schema::*,
    utils::{elapsed_since, get_fixed_delta_time, load_settings, time_duration, SCORE_ID, ZONE_ID},
    world::{build_query_world, load_registry},
};
use shared::{StackingZone, TopologyEngine};
use spacetimedb::{ReducerContext, ScheduleAt, Table, Timestamp};

/// Scheduled timer for the topology tick.
///
/// IMPORTANT:
/// Scheduled tables must include a `scheduled_id: u64` primary key with `#[auto_inc]`.
#[spacetimedb::table(name = topology_tick_timer, scheduled(topology_tick_reducer))]
pub struct TopologyTickTimer {
    /// Primary key for the scheduled job (single row used).
    #[primary_key]
    #[auto_inc]
    pub scheduled_id: u64,

    /// How often to invoke the scheduled reducer.
    pub scheduled_at: ScheduleAt,

    /// Timestamp of the previous invocation.
    pub last_tick: Timestamp,
}

/// Schedule the topology tick.
pub fn init(ctx: &ReducerContext) {
    let interval = load_settings(ctx).check_interval();

    // Single-row scheduled job.
    ctx.db.topology_tick_timer().scheduled_id().delete(1);
    ctx.db.topology_tick_timer().insert(TopologyTickTimer {
        scheduled_id: 1,
        scheduled_at: ScheduleAt::Interval(time_duration(interval)),
        last_tick: ctx.timestamp,
    });
}

#[spacetimedb::reducer]
pub fn topology_tick_reducer(
    ctx: &ReducerContext,
    mut timer: TopologyTickTimer,
) -> Result<(), String> {
    // Only the server (module identity) may invoke scheduled reducers.
    if ctx.sender != ctx.identity() {
        return Err("`topology_tick_reducer` may not be invoked by clients.".into());
    }

    if let (Some(fixed), Some(real)) = (
        get_fixed_delta_time(timer.scheduled_at),
        elapsed_since(ctx.timestamp, timer.last_tick),
    ) {
        if real > fixed * 2 {
            log::debug!("Topology tick late: {real:?} since last (interval {fixed:?})");
        }
    }

    let settings = load_settings(ctx);
    let registry = load_registry(ctx);
    let world = build_query_world(ctx, &registry, &settings);

    let mut zone = ctx
        .db
        .stacking_zone()
        .id()
        .find(ZONE_ID)
        .map(|z| StackingZone::new(z.center.into(), z.half_extents.into()));
    if let Some(zone) = zone.as_mut() {
        zone.refresh(&world);
    }

    let report = TopologyEngine::new(settings).compute(&registry, zone.as_ref(), &world);

    let changed: Vec<(u64, bool)> = registry
        .iter()
        .filter(|b| b.stacked != report.is_stacked(b.id))
        .map(|b| (b.id, !b.stacked))
        .collect();
    for (id, stacked) in changed {
        let Some(row) = ctx.db.tracked_block().id().find(id) else {
            continue;
        };
        log::debug!(
            "{} {}",
            row.name,
            if stacked { "stacked" } else { "unstacked" }
        );
        ctx.db
            .tracked_block()
            .id()
            .update(TrackedBlockRow { stacked, ..row });
    }

    publish_score(ctx, report.tallest);

    // Persist timer state.
    timer.last_tick = ctx.timestamp;
    ctx.db.topology_tick_timer().scheduled_id().update(timer);

    Ok(())
}

/// Write `value` to the replicated score row if it changed.
fn publish_score(ctx: &ReducerContext, value: u32) {
    let row = AuthoritativeScore {
        id: SCORE_ID,
        value,
        updated_at: ctx.timestamp,
    };
    match ctx.db.authoritative_score().id().find(SCORE_ID) {
        Some(previous) if previous.value == value => {}
        Some(previous) => {
            log::debug!("Score changed {} -> {value}", previous.value);
            ctx.db.authoritative_score().id().update(row);
        }
        None => {
            ctx.db.authoritative_score().insert(row);
        }
    }
}
