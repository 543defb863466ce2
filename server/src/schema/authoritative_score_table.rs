use spacetimedb::*;

/// Replicated score. A single row (`id = 1`), written only by the topology tick.
///
/// The row is updated only when the value changes, so every update a subscriber sees is a new
/// score, delivered in commit order.
#[table(name = authoritative_score, public)]
pub struct AuthoritativeScore {
    #[primary_key]
    pub id: u32,

    /// Height of the tallest settled tower.
    pub value: u32,

    pub updated_at: Timestamp,
}
