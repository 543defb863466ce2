//! Tracked blocks and their grab/release state machine.
//!
//! A block is `Free` or `Held(actor)`. Grabbing forces the block's stacked flag off
//! immediately; the topology tick is the only thing that turns it back on.
//!
//! The registry can live on any participant: grab detection is local to whichever client holds
//! the block. The host applies the forwarded notifications to its own registry so held blocks
//! drop out of settlement.

use crate::{
    error::GrabError,
    types::{ActorId, BlockId, BlockNotification, InteractionKind, Quat, Vec3},
};
use std::collections::BTreeMap;

/// Grab state of a single block.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GrabState {
    #[default]
    Free,
    Held(ActorId),
}

impl GrabState {
    pub const fn holder(self) -> Option<ActorId> {
        match self {
            Self::Free => None,
            Self::Held(actor) => Some(actor),
        }
    }

    pub const fn is_held(self) -> bool {
        matches!(self, Self::Held(_))
    }
}

/// A movable block observed in the scene.
///
/// Pose and speed are sampled from the physics backend; grab state is driven by notifications.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedBlock {
    pub id: BlockId,
    /// Object identifier written to the session log.
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    /// Collider half extents (meters).
    pub half_extents: Vec3,
    /// Linear velocity magnitude (m/s) from the latest physics sample.
    pub linear_speed: f32,
    pub grab: GrabState,
    /// Whether the block carries the stackable layer tag.
    pub stackable: bool,
    /// Settled and resting on another settled block, as of the last tick.
    pub stacked: bool,
}

impl TrackedBlock {
    /// A free, stackable, motionless block with identity rotation.
    pub fn new(id: BlockId, name: impl Into<String>, position: Vec3, half_extents: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            rotation: Quat::identity(),
            half_extents,
            linear_speed: 0.0,
            grab: GrabState::Free,
            stackable: true,
            stacked: false,
        }
    }

    pub fn with_speed(mut self, linear_speed: f32) -> Self {
        self.linear_speed = linear_speed;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Marks the block as untagged scenery: it is sensed but never counted.
    pub fn unstackable(mut self) -> Self {
        self.stackable = false;
        self
    }

    pub fn is_held(&self) -> bool {
        self.grab.is_held()
    }

    /// `Free -> Held(actor)`.
    pub fn grab(&mut self, actor: ActorId) -> Result<BlockNotification, GrabError> {
        if let GrabState::Held(holder) = self.grab {
            return Err(GrabError::AlreadyHeld {
                block: self.id,
                holder,
            });
        }

        self.grab = GrabState::Held(actor);
        // Held blocks never count as stacked.
        self.stacked = false;

        Ok(BlockNotification {
            kind: InteractionKind::Grabbed,
            actor,
            block: self.id,
            position: self.position,
        })
    }

    /// `Held(actor) -> Free`, leaving the block at `position`.
    pub fn release(&mut self, actor: ActorId, position: Vec3) -> Result<BlockNotification, GrabError> {
        match self.grab {
            GrabState::Free => Err(GrabError::NotHeld(self.id)),
            GrabState::Held(holder) if holder != actor => Err(GrabError::HeldByOther {
                block: self.id,
                holder,
                actor,
            }),
            GrabState::Held(_) => {
                self.grab = GrabState::Free;
                self.position = position;

                Ok(BlockNotification {
                    kind: InteractionKind::Released,
                    actor,
                    block: self.id,
                    position,
                })
            }
        }
    }
}

/// Session-scoped set of tracked blocks, ordered by id for deterministic iteration.
///
/// Blocks are never removed during a session.
#[derive(Clone, Debug, Default)]
pub struct BlockRegistry {
    blocks: BTreeMap<BlockId, TrackedBlock>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a block. Re-registering an id replaces its sampled state.
    pub fn insert(&mut self, block: TrackedBlock) {
        self.blocks.insert(block.id, block);
    }

    pub fn get(&self, id: BlockId) -> Option<&TrackedBlock> {
        self.blocks.get(&id)
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut TrackedBlock> {
        self.blocks.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedBlock> {
        self.blocks.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedBlock> {
        self.blocks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Apply a physics sample. Unknown ids are ignored; the next registration picks them up.
    pub fn update_motion(&mut self, id: BlockId, position: Vec3, rotation: Quat, linear_speed: f32) {
        let Some(block) = self.blocks.get_mut(&id) else {
            log::debug!("Motion sample for untracked block {id} ignored");
            return;
        };
        block.position = position;
        block.rotation = rotation;
        block.linear_speed = linear_speed;
    }

    pub fn grab(&mut self, id: BlockId, actor: ActorId) -> Result<BlockNotification, GrabError> {
        self.blocks
            .get_mut(&id)
            .ok_or(GrabError::UnknownBlock(id))?
            .grab(actor)
    }

    pub fn release(
        &mut self,
        id: BlockId,
        actor: ActorId,
        position: Vec3,
    ) -> Result<BlockNotification, GrabError> {
        self.blocks
            .get_mut(&id)
            .ok_or(GrabError::UnknownBlock(id))?
            .release(actor, position)
    }

    /// Apply a forwarded notification to this registry's grab state.
    ///
    /// This is how the host mirrors transitions detected on other participants.
    pub fn apply(&mut self, notification: &BlockNotification) -> Result<BlockNotification, GrabError> {
        match notification.kind {
            InteractionKind::Grabbed => self.grab(notification.block, notification.actor),
            InteractionKind::Released => self.release(
                notification.block,
                notification.actor,
                notification.position,
            ),
        }
    }
}
