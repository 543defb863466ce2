/// Scenery collider shape stored in the `world_static` table.
///
/// Blocks are always cuboids and carry their half extents on the `tracked_block` row, so only
/// the immovable scene (floor, table tops, walls) uses this enum.
#[derive(spacetimedb::SpacetimeType, Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    /// Infinite plane. The normal is `rotation * +Y`; the value is the offset along it (meters).
    Plane(f32),
    /// Oriented box with the given half extents (meters).
    Cuboid(super::DbVec3),
}
