use crate::schema::{authoritative_score, participant, stacking_settings};
use shared::{ActorId, StackingSettings};
use spacetimedb::{ReducerContext, ScheduleAt, TimeDuration, Timestamp};
use std::time::Duration;

pub const SETTINGS_ID: u32 = 1;
pub const SCORE_ID: u32 = 1;
pub const ZONE_ID: u32 = 1;

/// `now - earlier`, or `None` if the clock went backward.
pub fn elapsed_since(now: Timestamp, earlier: Timestamp) -> Option<Duration> {
    now.time_duration_since(earlier)
        .and_then(|d| u64::try_from(d.to_micros()).ok())
        .map(Duration::from_micros)
}

/// Period of an interval schedule. One-shot schedules have none.
pub fn get_fixed_delta_time(scheduled_at: ScheduleAt) -> Option<Duration> {
    match scheduled_at {
        ScheduleAt::Interval(dt) => u64::try_from(dt.to_micros()).ok().map(Duration::from_micros),
        ScheduleAt::Time(_) => None,
    }
}

pub fn time_duration(d: Duration) -> TimeDuration {
    TimeDuration::from_micros(i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
}

/// Current tunables. Falls back to the defaults if the settings row is missing.
pub fn load_settings(ctx: &ReducerContext) -> StackingSettings {
    match ctx.db.stacking_settings().id().find(SETTINGS_ID) {
        Some(row) => StackingSettings::from(&row),
        None => {
            log::warn!("stacking_settings row missing, using defaults");
            StackingSettings::default()
        }
    }
}

/// Actor id of the calling connection.
pub fn sender_actor(ctx: &ReducerContext) -> Result<ActorId, String> {
    ctx.db
        .participant()
        .identity()
        .find(ctx.sender)
        .map(|p| p.actor_id)
        .ok_or_else(|| format!("No participant for identity {:?}", ctx.sender))
}

/// Replicated score, or 0 before the first tick wrote it.
pub fn current_score(ctx: &ReducerContext) -> u32 {
    ctx.db
        .authoritative_score()
        .id()
        .find(SCORE_ID)
        .map_or(0, |s| s.value)
}
