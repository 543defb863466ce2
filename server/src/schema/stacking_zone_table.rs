use crate::types::*;
use spacetimedb::*;

/// Optional counting volume. When the single row (`id = 1`) exists, only blocks overlapping it
/// take part in topology.
#[table(name = stacking_zone, public)]
pub struct StackingZoneRow {
    #[primary_key]
    pub id: u32,

    pub center: DbVec3,
    pub half_extents: DbVec3,
}
