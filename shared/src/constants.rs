use std::time::Duration;

/// How often the host recomputes tower topology.
pub const CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Delay between a release notification and the confirmation that logs it.
///
/// The released event is recorded against the score read after this delay, so the
/// tower has had at least one topology tick to re-settle.
pub const RELEASE_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Linear speed (m/s) at or below which a block counts as settled.
pub const SETTLE_VELOCITY_MPS: f32 = 0.15;

/// Fraction of a block's horizontal half extents used for the shrunk sweep footprint.
///
/// `0.45` is roughly half the width of a cube, so a sweep never grazes a neighbour sitting
/// beside the block instead of on top of it.
pub const BOX_CAST_HALF_EXTENT_FACTOR: f32 = 0.45;

/// Half-height (meters) of the thin sweep box.
pub const SWEEP_HALF_HEIGHT_M: f32 = 0.01;

/// Offset (meters) applied to a block's bottom/top surface when placing the sweep origin.
pub const SURFACE_OFFSET_M: f32 = 0.01;

/// Extra distance (meters) searched below a block, past its half-height.
pub const EXTRA_SEARCH_DOWN_M: f32 = 0.05;

/// Extra distance (meters) searched above a block, past its full height.
pub const EXTRA_SEARCH_UP_M: f32 = 0.05;

/// Hard cap on the number of blocks counted in one upward walk.
pub const MAX_TOWER_STEPS: u32 = 50;

/// Upper bound on the number of hits collected by a single multi-hit sweep.
pub const MAX_SWEEP_HITS: usize = 64;
