use crate::types::*;
use shared::{GrabState, TrackedBlock};
use spacetimedb::*;

/// A movable block reported by the physics-owning participant.
///
/// Pose and speed are written by `report_block_motion`; `held_by` by the grab/release
/// reducers; `stacked` only by the topology tick. Rows are never deleted during a session.
#[table(name = tracked_block, public)]
pub struct TrackedBlockRow {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    /// Object identifier written to the session log.
    #[unique]
    pub name: String,

    pub translation: DbVec3,
    pub rotation: DbQuat,
    pub half_extents: DbVec3,

    /// Linear velocity magnitude from the latest sample (m/s).
    pub linear_speed: f32,

    /// Actor id of the current holder, if any.
    pub held_by: Option<u64>,

    /// Untagged blocks are sensed by sweeps but never counted.
    pub stackable: bool,

    /// Settled and resting on another settled block, as of the last tick.
    pub stacked: bool,
}

impl From<&TrackedBlockRow> for TrackedBlock {
    fn from(row: &TrackedBlockRow) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            position: row.translation.into(),
            rotation: row.rotation.into(),
            half_extents: row.half_extents.into(),
            linear_speed: row.linear_speed,
            grab: row.held_by.map_or(GrabState::Free, GrabState::Held),
            stackable: row.stackable,
            stacked: row.stacked,
        }
    }
}

impl TrackedBlockRow {
    /// Copy grab state and position back from a transitioned block.
    pub fn with_grab_state(self, block: &TrackedBlock) -> Self {
        Self {
            translation: block.position.into(),
            held_by: block.grab.holder(),
            stacked: block.stacked,
            ..self
        }
    }
}
