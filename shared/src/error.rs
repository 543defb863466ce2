//! Error types for the stacking core.
//!
//! Geometry failures are deliberately absent: a block whose bounds cannot be queried is simply
//! not eligible this tick.

use crate::{ActorId, BlockId};
use thiserror::Error;

/// Rejected grab/release transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrabError {
    #[error("block {0} is not tracked")]
    UnknownBlock(BlockId),

    #[error("block {block} is already held by actor {holder}")]
    AlreadyHeld { block: BlockId, holder: ActorId },

    #[error("block {0} is not held")]
    NotHeld(BlockId),

    #[error("block {block} is held by actor {holder}, not actor {actor}")]
    HeldByOther {
        block: BlockId,
        holder: ActorId,
        actor: ActorId,
    },
}

/// Failures writing the session log to stable storage.
#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("session log i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session log could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Invalid or unparsable [`crate::StackingSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("`{field}` must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f32,
    },
}

/// A stacking zone volume that cannot contain anything.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ZoneError {
    #[error("zone center must be finite, got {0:?}")]
    NonFiniteCenter([f32; 3]),

    #[error("zone half extents must be positive and finite, got {0:?}")]
    InvalidHalfExtents([f32; 3]),
}
