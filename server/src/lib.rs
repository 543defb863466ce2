mod log_store;
mod reducers {
    mod blocks;
    mod connection;
    pub mod interaction;
    pub(crate) mod topology_tick;
    mod zone;
}
pub mod schema;
pub mod types;
mod utils;
mod world;

use crate::{
    log_store::SESSION_ID,
    schema::*,
    utils::{SCORE_ID, SETTINGS_ID},
};
use reducers::topology_tick;
use shared::StackingSettings;
use spacetimedb::*;

/// Seed settings, the session header and the score row, then start the topology tick.
#[reducer(init)]
pub fn init(ctx: &ReducerContext) -> Result<(), String> {
    let settings = StackingSettings::default();
    settings.validate().map_err(|e| e.to_string())?;

    ctx.db.stacking_settings().id().delete(SETTINGS_ID);
    ctx.db
        .stacking_settings()
        .insert(StackingSettingsRow::from_settings(SETTINGS_ID, &settings));

    ctx.db.session().id().delete(SESSION_ID);
    ctx.db.session().insert(Session {
        id: SESSION_ID,
        started_at: ctx.timestamp,
    });
    log::info!(
        "Session started at {}",
        ctx.timestamp.to_micros_since_unix_epoch()
    );

    ctx.db.authoritative_score().id().delete(SCORE_ID);
    ctx.db.authoritative_score().insert(AuthoritativeScore {
        id: SCORE_ID,
        value: 0,
        updated_at: ctx.timestamp,
    });

    world::recreate_static_world(ctx);
    topology_tick::init(ctx);
    Ok(())
}
