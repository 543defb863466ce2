use crate::types::*;
use spacetimedb::*;

/// Immovable scenery (floor, table tops) loaded into every tick's query world.
///
/// Scenery carries no block tag, so block-layer sweeps and overlaps pass through it.
#[table(name = world_static, public)]
pub struct WorldStatic {
    /// Unique id (primary key).
    #[primary_key]
    #[auto_inc]
    pub id: u32,

    /// World transform applied to the shape.
    pub translation: DbVec3,
    pub rotation: DbQuat,

    /// Collider shape definition.
    pub shape: ColliderShape,
}
