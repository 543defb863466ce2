//! Tunable stacking parameters.
//!
//! Native hosts may load these from JSON; the server keeps them in the single-row
//! `stacking_settings` table and converts that row into this type every tick.

use crate::{
    constants::{
        BOX_CAST_HALF_EXTENT_FACTOR, CHECK_INTERVAL, EXTRA_SEARCH_DOWN_M, EXTRA_SEARCH_UP_M,
        MAX_SWEEP_HITS, MAX_TOWER_STEPS, RELEASE_SETTLE_DELAY, SETTLE_VELOCITY_MPS,
        SURFACE_OFFSET_M, SWEEP_HALF_HEIGHT_M,
    },
    error::SettingsError,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every constant the topology engine and the event pipeline read.
///
/// Distances are meters, speeds are meters per second and delays are milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackingSettings {
    /// Topology recompute interval (milliseconds).
    pub check_interval_ms: u64,
    /// Speed at or below which a block is settled (m/s).
    pub settle_velocity: f32,
    /// Delay before a release is confirmed and logged (milliseconds).
    pub release_settle_delay_ms: u64,
    /// Horizontal shrink factor for sweep footprints, in `(0, 1]`.
    pub box_cast_half_extent_factor: f32,
    /// Half-height of the thin sweep box.
    pub sweep_half_height: f32,
    /// Offset from a block surface to the sweep origin.
    pub surface_offset: f32,
    /// Extra distance searched below a block.
    pub extra_search_down: f32,
    /// Extra distance searched above a block.
    pub extra_search_up: f32,
    /// Hard cap on blocks counted in one upward walk.
    pub max_tower_steps: u32,
    /// Upper bound on hits collected by one sweep.
    pub max_sweep_hits: usize,
}

impl Default for StackingSettings {
    fn default() -> Self {
        Self {
            check_interval_ms: CHECK_INTERVAL.as_millis() as u64,
            settle_velocity: SETTLE_VELOCITY_MPS,
            release_settle_delay_ms: RELEASE_SETTLE_DELAY.as_millis() as u64,
            box_cast_half_extent_factor: BOX_CAST_HALF_EXTENT_FACTOR,
            sweep_half_height: SWEEP_HALF_HEIGHT_M,
            surface_offset: SURFACE_OFFSET_M,
            extra_search_down: EXTRA_SEARCH_DOWN_M,
            extra_search_up: EXTRA_SEARCH_UP_M,
            max_tower_steps: MAX_TOWER_STEPS,
            max_sweep_hits: MAX_SWEEP_HITS,
        }
    }
}

impl StackingSettings {
    /// Parse settings from JSON. Missing fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        non_zero("check_interval_ms", self.check_interval_ms)?;
        non_zero("max_tower_steps", u64::from(self.max_tower_steps))?;
        non_zero("max_sweep_hits", self.max_sweep_hits as u64)?;
        positive("sweep_half_height", self.sweep_half_height)?;
        non_negative("settle_velocity", self.settle_velocity)?;
        non_negative("surface_offset", self.surface_offset)?;
        non_negative("extra_search_down", self.extra_search_down)?;
        non_negative("extra_search_up", self.extra_search_up)?;

        let factor = self.box_cast_half_extent_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(SettingsError::OutOfRange {
                field: "box_cast_half_extent_factor",
                expected: "in (0, 1]",
                value: factor,
            });
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn release_settle_delay(&self) -> Duration {
        Duration::from_millis(self.release_settle_delay_ms)
    }
}

fn non_zero(field: &'static str, value: u64) -> Result<(), SettingsError> {
    if value > 0 {
        return Ok(());
    }
    Err(SettingsError::OutOfRange {
        field,
        expected: "> 0",
        value: 0.0,
    })
}

fn positive(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value > 0.0 {
        return Ok(());
    }
    Err(SettingsError::OutOfRange {
        field,
        expected: "> 0",
        value,
    })
}

fn non_negative(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value >= 0.0 {
        return Ok(());
    }
    Err(SettingsError::OutOfRange {
        field,
        expected: ">= 0",
        value,
    })
}
