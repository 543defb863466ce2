/// Rapier collider `user_data` packing for tracked blocks.
///
/// # Why this exists
/// Sweep hits come back as collider handles. To map a hit back to the tracked block and to
/// filter by layer without a side table, each collider carries a packed `u128` in `user_data`.
///
/// # Bit layout
/// (least-significant bit = bit 0)
///
/// - bits 0..=63   : `block_id` (u64)
/// - bits 64..=71  : layer mask (u8)
/// - bits 72..=127 : reserved (must be zero)
///
/// Static geometry (floors, tables) is inserted with a zero tag: no layer bits set, so it never
/// passes a layer filter.
///
/// # Compatibility
/// Colliders are rebuilt from tracked state every tick, so this layout never outlives a process.
pub type ColliderTag = u128;

use crate::BlockId;

/// Bitmask of query layers a collider belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u8);

impl LayerMask {
    pub const NONE: Self = Self(0);
    /// Movable, stackable blocks.
    pub const BLOCKS: Self = Self(1);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

/// Packs a block id and its layer mask into a collider tag.
pub fn pack_tag(id: BlockId, layers: LayerMask) -> ColliderTag {
    (id as u128) | ((layers.0 as u128) << BlockId::BITS)
}

/// Extracts the block id from a collider tag. Does not validate the layer bits.
pub fn unpack_block_id(tag: ColliderTag) -> BlockId {
    const ID_MASK: u128 = u64::MAX as u128;
    (tag & ID_MASK) as BlockId
}

/// Extracts the layer mask from a collider tag.
pub fn unpack_layers(tag: ColliderTag) -> LayerMask {
    const LAYER_MASK: u128 = u8::MAX as u128;
    LayerMask(((tag >> BlockId::BITS) & LAYER_MASK) as u8)
}

/// Returns the block id when the tag belongs to a collider on any of `filter`'s layers.
pub fn tagged_block(tag: ColliderTag, filter: LayerMask) -> Option<BlockId> {
    const RESERVED_MASK: u128 = !0u128 << 72;
    if tag & RESERVED_MASK != 0 || !unpack_layers(tag).contains(filter) {
        return None;
    }
    Some(unpack_block_id(tag))
}
