//! Connection lifecycle reducers.
//!
//! Behavior
//! - On connect: ensure a `Participant` row exists for the caller's identity and mark it online.
//!   The auto-incremented `actor_id` is the id every grab, release and log record carries.
//! - On disconnect: mark the row offline. Blocks the participant still holds stay held; the
//!   holder's client is expected to release them when it reconnects.

use crate::schema::*;
use spacetimedb::{ReducerContext, Table};

#[spacetimedb::reducer(client_connected)]
pub fn identity_connected(ctx: &ReducerContext) {
    if let Some(participant) = ctx.db.participant().identity().find(ctx.sender) {
        log::info!(
            "Client reconnected: {:?} as actor {}",
            ctx.sender,
            participant.actor_id
        );
        ctx.db.participant().identity().update(Participant {
            online: true,
            ..participant
        });
    } else {
        let participant = ctx.db.participant().insert(Participant {
            identity: ctx.sender,
            actor_id: 0,
            online: true,
        });
        log::info!(
            "Client connected: {:?} as actor {}",
            ctx.sender,
            participant.actor_id
        );
    }
}

#[spacetimedb::reducer(client_disconnected)]
pub fn identity_disconnected(ctx: &ReducerContext) {
    log::info!("Client disconnected: {:?}", ctx.sender);

    let Some(participant) = ctx.db.participant().identity().find(ctx.sender) else {
        return;
    };

    let held = ctx
        .db
        .tracked_block()
        .iter()
        .filter(|b| b.held_by == Some(participant.actor_id))
        .count();
    if held > 0 {
        log::warn!(
            "Actor {} disconnected holding {held} block(s)",
            participant.actor_id
        );
    }

    ctx.db.participant().identity().update(Participant {
        online: false,
        ..participant
    });
}
