use spacetimedb::*;

/// Session header. A single row (`id = 1`) written by `init`.
///
/// Missing row means the session log was never initialized: interaction events are dropped
/// with a warning while scoring carries on.
#[table(name = session)]
pub struct Session {
    #[primary_key]
    pub id: u32,

    /// Wall clock at session start.
    pub started_at: Timestamp,
}
