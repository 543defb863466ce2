//! Session log backed by the `interaction_event` table.
//!
//! A row is durable once the reducer transaction that inserted it commits. If the reducer
//! fails afterward, the row rolls back together with the transition that produced it.

use crate::{
    schema::{interaction_event, session, InteractionEventRow, Session},
    types::DbInteractionKind,
    utils::elapsed_since,
};
use shared::{InteractionEvent, LogStoreError, SessionInstant, SessionLogStore};
use spacetimedb::{ReducerContext, Table};

pub const SESSION_ID: u32 = 1;

pub struct TableLogStore<'a> {
    ctx: &'a ReducerContext,
    session_id: u32,
}

impl<'a> TableLogStore<'a> {
    /// Store for the current session, or `None` when `init` never wrote the session row.
    pub fn open(ctx: &'a ReducerContext) -> Option<Self> {
        ctx.db.session().id().find(SESSION_ID).map(|s| Self {
            ctx,
            session_id: s.id,
        })
    }
}

impl SessionLogStore for TableLogStore<'_> {
    fn append(&mut self, event: InteractionEvent) -> Result<(), LogStoreError> {
        self.ctx.db.interaction_event().insert(InteractionEventRow {
            id: 0,
            session_id: self.session_id,
            timestamp_micros: event.timestamp_micros,
            game_time: event.game_time,
            player_id: event.player_id,
            block_id: event.block_id,
            block_name: event.block_name,
            action: DbInteractionKind::from(event.action),
            position: event.position.into(),
            score: event.score,
        });
        Ok(())
    }
}

/// Session-relative instant for `ctx.timestamp`.
///
/// Without a session row, session time is zero.
pub fn session_instant(ctx: &ReducerContext) -> SessionInstant {
    let started_at = ctx
        .db
        .session()
        .id()
        .find(SESSION_ID)
        .map_or(ctx.timestamp, |s: Session| s.started_at);

    SessionInstant {
        wall_clock_micros: ctx.timestamp.to_micros_since_unix_epoch(),
        session_time: elapsed_since(ctx.timestamp, started_at).unwrap_or_default(),
    }
}
