/// A unit quaternion (w + xi + yj + zk), stored as four `f32` scalars.
///
/// Semantics:
/// - Represents a block orientation in world space.
/// - Stored in `(x, y, z, w)` order to match common game engine conventions.
/// - This is a purely data/serialization type; math happens elsewhere.
#[derive(spacetimedb::SpacetimeType, Debug, Clone, Copy, PartialEq)]
pub struct DbQuat {
    /// x component (imaginary i)
    pub x: f32,
    /// y component (imaginary j)
    pub y: f32,
    /// z component (imaginary k)
    pub z: f32,
    /// w component (real part)
    pub w: f32,
}

impl DbQuat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for DbQuat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<DbQuat> for nalgebra::UnitQuaternion<f32> {
    /// Renormalizes, so slightly denormalized client samples are accepted.
    fn from(q: DbQuat) -> Self {
        nalgebra::UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(q.w, q.x, q.y, q.z))
    }
}

impl From<nalgebra::UnitQuaternion<f32>> for DbQuat {
    fn from(uq: nalgebra::UnitQuaternion<f32>) -> Self {
        let q = uq.into_inner();
        DbQuat {
            x: q.i,
            y: q.j,
            z: q.k,
            w: q.w,
        }
    }
}
