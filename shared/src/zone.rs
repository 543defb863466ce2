//! Optional stacking zone.
//!
//! A box volume whose membership set filters which blocks the topology engine considers.
//! Membership changes on enter/exit notifications, or all at once from an overlap query when the
//! backend has no trigger events.

use crate::{
    error::ZoneError,
    spatial::SpatialQuery,
    tag::LayerMask,
    types::{BlockId, Vec3},
};
use std::collections::BTreeSet;

/// Membership change reported by [`StackingZone::refresh`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ZoneEvent {
    Entered(BlockId),
    Exited(BlockId),
}

#[derive(Clone, Debug)]
pub struct StackingZone {
    pub center: Vec3,
    pub half_extents: Vec3,
    members: BTreeSet<BlockId>,
}

impl StackingZone {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
            members: BTreeSet::new(),
        }
    }

    /// Like [`StackingZone::new`], but rejects a volume that cannot overlap anything.
    pub fn try_new(center: Vec3, half_extents: Vec3) -> Result<Self, ZoneError> {
        if !center.iter().all(|v| v.is_finite()) {
            return Err(ZoneError::NonFiniteCenter(center.into()));
        }
        if !half_extents.iter().all(|v| v.is_finite() && *v > 0.0) {
            return Err(ZoneError::InvalidHalfExtents(half_extents.into()));
        }
        Ok(Self::new(center, half_extents))
    }

    pub fn on_enter(&mut self, block: BlockId) {
        self.members.insert(block);
    }

    pub fn on_exit(&mut self, block: BlockId) {
        self.members.remove(&block);
    }

    pub fn contains(&self, block: BlockId) -> bool {
        self.members.contains(&block)
    }

    pub fn members(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.members.iter().copied()
    }

    /// Re-derive membership from an overlap query and return the enter/exit delta, exits first.
    pub fn refresh(&mut self, query: &impl SpatialQuery) -> Vec<ZoneEvent> {
        let now: BTreeSet<BlockId> = query
            .overlap_test(self.center, self.half_extents, LayerMask::BLOCKS)
            .into_iter()
            .collect();

        let mut events: Vec<ZoneEvent> = self
            .members
            .difference(&now)
            .map(|id| ZoneEvent::Exited(*id))
            .collect();
        events.extend(now.difference(&self.members).map(|id| ZoneEvent::Entered(*id)));

        self.members = now;
        events
    }
}
