use crate::types::*;
use spacetimedb::*;

/// Append-only session log. One row per recorded grab or release.
///
/// Rows are never updated or deleted; `id` order is record order.
#[table(name = interaction_event)]
pub struct InteractionEventRow {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    pub session_id: u32,

    /// Wall clock, microseconds since the Unix epoch.
    pub timestamp_micros: i64,

    /// Seconds since session start.
    pub game_time: f32,

    #[index(btree)]
    pub player_id: u64,

    #[index(btree)]
    pub block_id: u64,

    pub block_name: String,
    pub action: DbInteractionKind,
    pub position: DbVec3,

    /// Authoritative score when the event was recorded.
    pub score: u32,
}
