//! Settlement filter.
//!
//! A block is settled when its sampled speed is at or below the threshold and nobody holds it.
//! There is no hysteresis: each tick looks only at the current sample, so a nudged tower can
//! drop out of and back into "stacked" within a single tick.

use crate::block::TrackedBlock;

pub fn is_settled(block: &TrackedBlock, settle_velocity: f32) -> bool {
    block.linear_speed <= settle_velocity && !block.is_held()
}

/// Settled and carrying the stackable tag: the only blocks the topology engine counts.
pub fn is_eligible(block: &TrackedBlock, settle_velocity: f32) -> bool {
    block.stackable && is_settled(block, settle_velocity)
}
