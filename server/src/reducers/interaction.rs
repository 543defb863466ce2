//! Grab/release endpoints and the deferred release record.
//!
//! This file contains:
//! - `block_grabbed` / `block_released` client reducers
//! - `DeferredReleaseTimer` one-shot scheduled table
//! - `deferred_release_reducer`, which records the release against the post-settle score
//!
//! Notes:
//! - SpacetimeDB runs reducers one at a time, so notifications are handled strictly in arrival
//!   order and never interleave with the topology tick.
//! - A rejected transition returns `Err` and the transaction rolls back untouched.
//! - Deferred releases are never cancelled, even if the block is grabbed again first.

use crate::{
    log_store::{session_instant, TableLogStore},
    schema::*,
    types::*,
    utils::{current_score, load_settings, sender_actor, time_duration},
};
use shared::{
    BlockNotification, DeferredRelease, GrabError, InteractionKind, ScorePipeline, TrackedBlock,
};
use spacetimedb::{ReducerContext, ScheduleAt, Table};

/// Pending release log record.
#[spacetimedb::table(name = deferred_release_timer, scheduled(deferred_release_reducer))]
pub struct DeferredReleaseTimer {
    #[primary_key]
    #[auto_inc]
    pub scheduled_id: u64,

    /// One-shot: `ctx.timestamp + release_settle_delay` at release time.
    pub scheduled_at: ScheduleAt,

    pub actor_id: u64,
    pub block_id: u64,
    pub block_name: String,
    /// Release position.
    pub position: DbVec3,
}

/// Apply `f` to the block and write the new grab state back.
fn transition(
    ctx: &ReducerContext,
    block_id: u64,
    f: impl FnOnce(&mut TrackedBlock) -> Result<BlockNotification, GrabError>,
) -> Result<(BlockNotification, String), String> {
    let Some(row) = ctx.db.tracked_block().id().find(block_id) else {
        return Err(format!("Block {block_id} is not tracked"));
    };

    let mut block = TrackedBlock::from(&row);
    let notification = f(&mut block).map_err(|e| {
        log::warn!("Rejected transition on {}: {e}", row.name);
        e.to_string()
    })?;

    let name = row.name.clone();
    ctx.db.tracked_block().id().update(row.with_grab_state(&block));
    Ok((notification, name))
}

/// The caller picked up `block_id`.
///
/// Recorded immediately, against the score from before the block moved.
#[spacetimedb::reducer]
pub fn block_grabbed(ctx: &ReducerContext, block_id: u64) -> Result<(), String> {
    let actor = sender_actor(ctx)?;
    let (notification, name) = transition(ctx, block_id, |b| b.grab(actor))?;

    let settings = load_settings(ctx);
    let mut pipeline = ScorePipeline::host(TableLogStore::open(ctx), &settings);
    pipeline.on_grabbed(&notification, &name, current_score(ctx), session_instant(ctx));
    Ok(())
}

/// The caller let go of `block_id` at `position`.
///
/// Schedules the release record `release_settle_delay_ms` from now.
#[spacetimedb::reducer]
pub fn block_released(ctx: &ReducerContext, block_id: u64, position: DbVec3) -> Result<(), String> {
    let actor = sender_actor(ctx)?;
    let (notification, name) = transition(ctx, block_id, |b| b.release(actor, position.into()))?;

    let settings = load_settings(ctx);
    let pipeline = ScorePipeline::host(TableLogStore::open(ctx), &settings);
    let at = session_instant(ctx);
    let Some(deferred) = pipeline.on_released(&notification, &name, at) else {
        return Ok(());
    };

    let delay = deferred.due_at.saturating_sub(at.session_time);
    ctx.db.deferred_release_timer().insert(DeferredReleaseTimer {
        scheduled_id: 0,
        scheduled_at: ScheduleAt::Time(ctx.timestamp + time_duration(delay)),
        actor_id: actor,
        block_id,
        block_name: deferred.block_name,
        position,
    });
    Ok(())
}

#[spacetimedb::reducer]
pub fn deferred_release_reducer(
    ctx: &ReducerContext,
    timer: DeferredReleaseTimer,
) -> Result<(), String> {
    // Only the server (module identity) may invoke scheduled reducers.
    if ctx.sender != ctx.identity() {
        return Err("`deferred_release_reducer` may not be invoked by clients.".into());
    }

    let at = session_instant(ctx);
    let deferred = DeferredRelease {
        due_at: at.session_time,
        notification: BlockNotification {
            kind: InteractionKind::Released,
            actor: timer.actor_id,
            block: timer.block_id,
            position: timer.position.into(),
        },
        block_name: timer.block_name,
    };

    let settings = load_settings(ctx);
    let mut pipeline = ScorePipeline::host(TableLogStore::open(ctx), &settings);
    pipeline.confirm_release(&deferred, current_score(ctx), at);
    Ok(())
}
