use shared::StackingSettings;
use spacetimedb::*;

/// Stacking tunables shared by the server and subscribed clients.
///
/// This is intended to be a single-row table (`id = 1`) that both:
/// - the server reads every topology tick and on every grab/release, and
/// - clients subscribe to so local, non-authoritative previews use the same thresholds.
///
/// Notes
/// - Distances are meters, speeds m/s, intervals milliseconds.
/// - Seeded from `StackingSettings::default()` by `init`.
#[table(name = stacking_settings, public)]
pub struct StackingSettingsRow {
    /// Unique id (primary key). Use a single row with `id = 1`.
    #[primary_key]
    pub id: u32,

    /// Topology tick period (milliseconds).
    pub check_interval_ms: u64,

    /// Linear speed at or below which a block counts as settled (m/s).
    pub settle_velocity: f32,

    /// Delay between a release and its log record (milliseconds).
    pub release_settle_delay_ms: u64,

    /// Footprint shrink factor applied to sweep half extents, in `(0, 1]`.
    pub box_cast_half_extent_factor: f32,

    /// Half height of the thin sweep box (meters).
    pub sweep_half_height: f32,

    /// Distance the sweep starts inside the block's own face (meters).
    pub surface_offset: f32,

    /// Extra downward search distance beyond the surface offset (meters).
    pub extra_search_down: f32,

    /// Extra upward search distance beyond one block height (meters).
    pub extra_search_up: f32,

    /// Upper bound on steps of one upward tower walk.
    pub max_tower_steps: u32,

    /// Upper bound on hits returned by one sweep.
    pub max_sweep_hits: u32,
}

impl StackingSettingsRow {
    pub fn from_settings(id: u32, s: &StackingSettings) -> Self {
        Self {
            id,
            check_interval_ms: s.check_interval_ms,
            settle_velocity: s.settle_velocity,
            release_settle_delay_ms: s.release_settle_delay_ms,
            box_cast_half_extent_factor: s.box_cast_half_extent_factor,
            sweep_half_height: s.sweep_half_height,
            surface_offset: s.surface_offset,
            extra_search_down: s.extra_search_down,
            extra_search_up: s.extra_search_up,
            max_tower_steps: s.max_tower_steps,
            max_sweep_hits: u32::try_from(s.max_sweep_hits).unwrap_or(u32::MAX),
        }
    }
}

impl From<&StackingSettingsRow> for StackingSettings {
    fn from(row: &StackingSettingsRow) -> Self {
        Self {
            check_interval_ms: row.check_interval_ms,
            settle_velocity: row.settle_velocity,
            release_settle_delay_ms: row.release_settle_delay_ms,
            box_cast_half_extent_factor: row.box_cast_half_extent_factor,
            sweep_half_height: row.sweep_half_height,
            surface_offset: row.surface_offset,
            extra_search_down: row.extra_search_down,
            extra_search_up: row.extra_search_up,
            max_tower_steps: row.max_tower_steps,
            max_sweep_hits: row.max_sweep_hits as usize,
        }
    }
}
