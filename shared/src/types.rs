/*!
Core math aliases and identifiers shared by every stacking module.

This module intentionally contains no algorithms.
*/

use nalgebra as na;
use serde::{Deserialize, Serialize};

pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// Stable identity of a tracked block for the lifetime of a session.
pub type BlockId = u64;

/// Identity of a participant (client or host) acting on blocks.
pub type ActorId = u64;

/// What a participant did to a block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Grabbed,
    Released,
}

impl InteractionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grabbed => "grabbed",
            Self::Released => "released",
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grab/release transition, as forwarded from the grabbing participant to the host.
///
/// This is the only gameplay input the event pipeline consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockNotification {
    pub kind: InteractionKind,
    pub actor: ActorId,
    pub block: BlockId,
    /// Block position (meters) at the moment of the transition.
    pub position: Vec3,
}

/// Plain position triple used in persisted records.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3Data {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Vec3Data {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Vec3Data> for Vec3 {
    fn from(v: Vec3Data) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}
