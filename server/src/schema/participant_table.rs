use spacetimedb::*;

/// Maps a connection identity to the numeric actor id used in events and grab state.
///
/// Rows survive disconnects so a reconnecting client keeps its actor id.
#[table(name = participant, public)]
pub struct Participant {
    #[primary_key]
    pub identity: Identity,

    #[unique]
    #[auto_inc]
    pub actor_id: u64,

    pub online: bool,
}
