//! Stack topology inference.
//!
//! Every tick, from scratch:
//! 1. Eligible set: stackable, settled, unheld blocks (zone members only, when a zone is given)
//!    whose bounds the backend can report.
//! 2. Support: a thin, shrunk-footprint sweep down from just above each eligible block's bottom.
//!    The nearest layered hit that is not the block itself is its "directly below" candidate; it
//!    counts as support only when that block is eligible too.
//! 3. Bases: eligible blocks without support.
//! 4. Towers: from each base, repeatedly sweep up from the top surface and step to the eligible
//!    hit with the lowest center. The walk ends when nothing is found, when a non-eligible block
//!    is hit nearer than that candidate, when the candidate rests on a different block, or when
//!    the step cap is reached.
//! 5. Score: tallest tower, or 0.
//!
//! Notes:
//! - The rests-on relation is a forest in any physically plausible scene, but nothing here relies
//!   on that: the upward walk tracks visited blocks and is capped by `max_tower_steps`.
//! - No state survives between ticks, so a failed query only costs one tick.

use crate::{
    block::BlockRegistry,
    settings::StackingSettings,
    settlement::is_eligible,
    spatial::{Bounds, SpatialQuery},
    tag::LayerMask,
    types::{BlockId, Vec3},
    zone::StackingZone,
};
use std::collections::{BTreeMap, BTreeSet};

/// Result of one topology pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopologyReport {
    /// Blocks considered this tick.
    pub eligible: BTreeSet<BlockId>,
    /// `block -> block directly below`, for supported eligible blocks only.
    pub rests_on: BTreeMap<BlockId, BlockId>,
    /// Eligible blocks with nothing eligible beneath them.
    pub bases: BTreeSet<BlockId>,
    /// Tower height counted upward from each base.
    pub tower_heights: BTreeMap<BlockId, u32>,
    /// Height of the tallest tower; the authoritative score.
    pub tallest: u32,
}

impl TopologyReport {
    /// A block is stacked when it is eligible and rests on another eligible block.
    pub fn is_stacked(&self, block: BlockId) -> bool {
        self.rests_on.contains_key(&block)
    }

    pub fn stacked(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.rests_on.keys().copied()
    }

    /// `true` when following `rests_on` from any block never returns to a visited block.
    pub fn is_forest(&self) -> bool {
        self.rests_on.keys().all(|&start| {
            let mut seen = BTreeSet::from([start]);
            let mut current = start;
            while let Some(&below) = self.rests_on.get(&current) {
                if !seen.insert(below) {
                    return false;
                }
                current = below;
            }
            true
        })
    }
}

/// Computes tower topology from geometric queries.
#[derive(Clone, Debug, Default)]
pub struct TopologyEngine {
    settings: StackingSettings,
}

impl TopologyEngine {
    pub fn new(settings: StackingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &StackingSettings {
        &self.settings
    }

    pub fn compute(
        &self,
        blocks: &BlockRegistry,
        zone: Option<&StackingZone>,
        query: &impl SpatialQuery,
    ) -> TopologyReport {
        let eligible: BTreeMap<BlockId, Bounds> = blocks
            .iter()
            .filter(|b| is_eligible(b, self.settings.settle_velocity))
            .filter(|b| zone.is_none_or(|z| z.contains(b.id)))
            .filter_map(|b| query.bounds(b.id).map(|bounds| (b.id, bounds)))
            .collect();

        let mut report = TopologyReport {
            eligible: eligible.keys().copied().collect(),
            ..TopologyReport::default()
        };

        for (&id, bounds) in &eligible {
            match self.support_below(id, bounds, &eligible, query) {
                Some(below) => {
                    report.rests_on.insert(id, below);
                }
                None => {
                    report.bases.insert(id);
                }
            }
        }

        for &base in &report.bases {
            let height = self.tower_height(base, &eligible, &report.rests_on, query);
            report.tower_heights.insert(base, height);
            report.tallest = report.tallest.max(height);
        }

        report
    }

    /// Shrunk footprint used by both sweep directions.
    fn footprint(&self, bounds: &Bounds) -> Vec3 {
        let he = bounds.half_extents();
        let factor = self.settings.box_cast_half_extent_factor;
        Vec3::new(he.x * factor, self.settings.sweep_half_height, he.z * factor)
    }

    /// The eligible block directly beneath `id`, if the nearest layered hit is one.
    fn support_below(
        &self,
        id: BlockId,
        bounds: &Bounds,
        eligible: &BTreeMap<BlockId, Bounds>,
        query: &impl SpatialQuery,
    ) -> Option<BlockId> {
        let center = bounds.center();
        // Start just above the bottom so the sweep does not begin inside whatever is below.
        let origin = Vec3::new(center.x, bounds.mins.y + self.settings.surface_offset, center.z);
        let distance = bounds.half_extents().y + self.settings.extra_search_down;

        let nearest = query
            .sweep_test(
                origin,
                self.footprint(bounds),
                -Vec3::y(),
                distance,
                LayerMask::BLOCKS,
            )
            .into_iter()
            .find(|hit| hit.block != id)?;

        eligible.contains_key(&nearest.block).then_some(nearest.block)
    }

    /// The lowest eligible block directly above `id`, skipping blocks already in this tower.
    ///
    /// Returns `None` when a held, moving or untracked block is hit before that candidate, so a
    /// long upward sweep never bridges a gap in the tower.
    fn nearest_above(
        &self,
        id: BlockId,
        bounds: &Bounds,
        eligible: &BTreeMap<BlockId, Bounds>,
        visited: &BTreeSet<BlockId>,
        query: &impl SpatialQuery,
    ) -> Option<BlockId> {
        let center = bounds.center();
        let origin = Vec3::new(center.x, bounds.maxs.y + self.settings.surface_offset, center.z);
        let distance = bounds.height() + self.settings.extra_search_up;

        let hits = query.sweep_test(
            origin,
            self.footprint(bounds),
            Vec3::y(),
            distance,
            LayerMask::BLOCKS,
        );

        let mut best: Option<(BlockId, f32, f32)> = None;
        let mut nearest_blocker: Option<f32> = None;
        for hit in hits {
            if hit.block == id || visited.contains(&hit.block) {
                continue;
            }
            let Some(above) = eligible.get(&hit.block) else {
                // Hits arrive nearest first.
                nearest_blocker.get_or_insert(hit.distance);
                continue;
            };
            let y = above.center().y;
            // Strict: on equal height the first hit (nearest, then lowest id) wins.
            if best.is_none_or(|(_, best_y, _)| y < best_y) {
                best = Some((hit.block, y, hit.distance));
            }
        }

        let (block, _, reached_at) = best?;
        if nearest_blocker.is_some_and(|blocker| blocker < reached_at) {
            log::trace!("Walk above block {id} ends at a non-eligible block before {block}");
            return None;
        }
        Some(block)
    }

    fn tower_height(
        &self,
        base: BlockId,
        eligible: &BTreeMap<BlockId, Bounds>,
        rests_on: &BTreeMap<BlockId, BlockId>,
        query: &impl SpatialQuery,
    ) -> u32 {
        let cap = self.settings.max_tower_steps.max(1);
        let mut visited = BTreeSet::from([base]);
        let mut current = base;
        let mut height = 1;

        while height < cap {
            let Some(bounds) = eligible.get(&current) else {
                break;
            };
            let Some(above) = self.nearest_above(current, bounds, eligible, &visited, query) else {
                break;
            };
            if rests_on.get(&above).is_some_and(|&below| below != current) {
                break;
            }
            visited.insert(above);
            current = above;
            height += 1;
        }

        if height == cap {
            log::warn!("Tower walk from block {base} hit the {cap} step cap");
        }
        height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::TrackedBlock,
        rapier_world::BlockQueryWorld,
        spatial::SweepHit,
    };
    use std::cell::RefCell;

    fn cube(id: BlockId, x: f32, level: u32) -> TrackedBlock {
        TrackedBlock::new(
            id,
            format!("Block_{id}"),
            Vec3::new(x, 0.5 + level as f32, 0.0),
            Vec3::new(0.5, 0.5, 0.5),
        )
    }

    fn registry(blocks: impl IntoIterator<Item = TrackedBlock>) -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        blocks.into_iter().for_each(|b| registry.insert(b));
        registry
    }

    fn run(registry: &BlockRegistry) -> TopologyReport {
        let world = BlockQueryWorld::from_registry(registry, 64);
        TopologyEngine::default().compute(registry, None, &world)
    }

    fn three_stack() -> BlockRegistry {
        registry([cube(1, 0.0, 0), cube(2, 0.0, 1), cube(3, 0.0, 2)])
    }

    #[test]
    fn three_settled_blocks_make_a_tower_of_three() {
        let report = run(&three_stack());

        assert_eq!(report.tallest, 3);
        assert_eq!(report.bases, BTreeSet::from([1]));
        assert_eq!(report.rests_on, BTreeMap::from([(2, 1), (3, 2)]));
        assert!(report.is_forest());
    }

    #[test]
    fn holding_the_top_block_drops_the_score_to_two() {
        let mut blocks = three_stack();
        blocks.grab(3, 1).expect("grab");

        let report = run(&blocks);
        assert_eq!(report.tallest, 2);
        assert!(!report.eligible.contains(&3));
    }

    #[test]
    fn block_resting_on_a_held_block_becomes_a_base() {
        let mut blocks = three_stack();
        blocks.grab(2, 1).expect("grab");

        let report = run(&blocks);
        assert_eq!(report.bases, BTreeSet::from([1, 3]));
        assert_eq!(report.tallest, 1);
        assert!(!report.is_stacked(3));
    }

    #[test]
    fn two_separate_blocks_score_one() {
        let report = run(&registry([cube(1, 0.0, 0), cube(2, 3.0, 0)]));

        assert_eq!(report.bases, BTreeSet::from([1, 2]));
        assert_eq!(report.tower_heights, BTreeMap::from([(1, 1), (2, 1)]));
        assert_eq!(report.tallest, 1);
    }

    #[test]
    fn fast_moving_block_above_is_ignored() {
        let report = run(&registry([
            cube(1, 0.0, 0),
            cube(2, 0.0, 1).with_speed(1.0),
        ]));

        assert_eq!(report.tallest, 1);
        assert!(!report.eligible.contains(&2));
        assert!(!report.bases.contains(&2));
        assert!(report.rests_on.is_empty());
    }

    #[test]
    fn walk_does_not_reach_past_a_moving_block() {
        let report = run(&registry([
            cube(1, 0.0, 0),
            cube(2, 0.0, 1).with_speed(1.0),
            cube(3, 0.0, 2),
        ]));

        assert_eq!(report.bases, BTreeSet::from([1, 3]));
        assert_eq!(report.tower_heights, BTreeMap::from([(1, 1), (3, 1)]));
    }

    #[test]
    fn wide_block_overhanging_a_narrow_base_extends_its_tower() {
        // The wide block's shrunk footprint misses the narrow block below it, so it is a base
        // of its own, but the narrow block's upward sweep still reaches it.
        let narrow = TrackedBlock::new(
            1,
            "Narrow",
            Vec3::new(0.0, 0.25, 0.0),
            Vec3::new(0.25, 0.25, 0.25),
        );
        let wide = TrackedBlock::new(
            2,
            "Wide",
            Vec3::new(0.8, 1.5, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
        );

        let report = run(&registry([narrow, wide]));
        assert_eq!(report.bases, BTreeSet::from([1, 2]));
        assert_eq!(report.tower_heights, BTreeMap::from([(1, 2), (2, 1)]));
        assert_eq!(report.tallest, 2);
    }

    #[test]
    fn walk_stops_at_a_block_resting_on_another_tower() {
        // 3 rests on 2; a sweep from 1 that reaches 3 must not claim it.
        let query = ScriptedQuery {
            above: BTreeMap::from([(1, vec![3]), (2, vec![3])]),
            below: BTreeMap::from([(3, 2)]),
        };
        let blocks = registry([cube(1, 1.0, 0), cube(2, 2.0, 0), cube(3, 3.0, 1)]);
        let report = TopologyEngine::default().compute(&blocks, None, &query);

        assert_eq!(report.rests_on, BTreeMap::from([(3, 2)]));
        assert_eq!(report.tower_heights, BTreeMap::from([(1, 1), (2, 2)]));
    }

    /// Backend answering from fixed adjacency lists, keyed by the block whose x the origin is at.
    struct ScriptedQuery {
        above: BTreeMap<BlockId, Vec<BlockId>>,
        below: BTreeMap<BlockId, BlockId>,
    }

    impl SpatialQuery for ScriptedQuery {
        fn sweep_test(&self, origin: Vec3, _: Vec3, dir: Vec3, _: f32, _: LayerMask) -> Vec<SweepHit> {
            let from = origin.x.round() as BlockId;
            let hits: Vec<BlockId> = if dir.y > 0.0 {
                self.above.get(&from).cloned().unwrap_or_default()
            } else {
                self.below.get(&from).copied().into_iter().collect()
            };
            hits.into_iter()
                .map(|block| SweepHit {
                    block,
                    point: Vec3::zeros(),
                    distance: 0.5,
                })
                .collect()
        }

        fn overlap_test(&self, _: Vec3, _: Vec3, _: LayerMask) -> Vec<BlockId> {
            Vec::new()
        }

        fn bounds(&self, block: BlockId) -> Option<Bounds> {
            let x = block as f32;
            Some(Bounds {
                mins: Vec3::new(x - 0.1, 0.0, -0.1),
                maxs: Vec3::new(x + 0.1, 1.0, 0.1),
            })
        }
    }

    #[test]
    fn empty_scene_scores_zero() {
        let report = run(&BlockRegistry::new());
        assert_eq!(report.tallest, 0);
        assert!(report.bases.is_empty());
    }

    #[test]
    fn unstackable_block_is_neither_counted_nor_support() {
        let report = run(&registry([cube(1, 0.0, 0).unstackable(), cube(2, 0.0, 1)]));

        assert_eq!(report.eligible, BTreeSet::from([2]));
        assert_eq!(report.bases, BTreeSet::from([2]));
        assert_eq!(report.tallest, 1);
    }

    #[test]
    fn repeated_passes_over_one_snapshot_agree() {
        let blocks = registry([
            cube(1, 0.0, 0),
            cube(2, 0.0, 1),
            cube(3, 4.0, 0),
            cube(4, 4.0, 1),
            cube(5, 4.0, 2).with_speed(3.0),
        ]);
        let world = BlockQueryWorld::from_registry(&blocks, 64);
        let engine = TopologyEngine::default();

        let first = engine.compute(&blocks, None, &world);
        let second = engine.compute(&blocks, None, &world);
        assert_eq!(first, second);
        assert_eq!(first.tallest, 2);
    }

    #[test]
    fn no_block_rests_on_itself() {
        let report = run(&three_stack());
        assert!(report.rests_on.iter().all(|(block, below)| block != below));
    }

    #[test]
    fn zone_excludes_blocks_outside_it() {
        let blocks = registry([cube(1, 0.0, 0), cube(2, 0.0, 1), cube(3, 5.0, 0)]);
        let world = BlockQueryWorld::from_registry(&blocks, 64);

        let mut zone = StackingZone::new(Vec3::new(5.0, 1.0, 0.0), Vec3::new(1.0, 2.0, 1.0));
        zone.refresh(&world);

        let report = TopologyEngine::default().compute(&blocks, Some(&zone), &world);
        assert_eq!(report.eligible, BTreeSet::from([3]));
        assert_eq!(report.tallest, 1);
    }

    #[test]
    fn tower_walk_stops_at_step_cap() {
        let blocks = registry((0..8).map(|i| cube(i, 0.0, i as u32)));
        let world = BlockQueryWorld::from_registry(&blocks, 64);
        let engine = TopologyEngine::new(StackingSettings {
            max_tower_steps: 5,
            ..StackingSettings::default()
        });

        assert_eq!(engine.compute(&blocks, None, &world).tallest, 5);
        assert_eq!(TopologyEngine::default().compute(&blocks, None, &world).tallest, 8);
    }

    /// Backend that reports every other block as both above and below, i.e. a cycle.
    struct CyclicQuery;

    impl SpatialQuery for CyclicQuery {
        fn sweep_test(&self, origin: Vec3, _: Vec3, _: Vec3, _: f32, _: LayerMask) -> Vec<SweepHit> {
            // Origins sit inside the sweeping block's footprint; report the other two.
            let from = origin.x.round() as BlockId;
            (1..=3)
                .filter(|id| *id != from)
                .map(|block| SweepHit {
                    block,
                    point: Vec3::zeros(),
                    distance: 0.0,
                })
                .collect()
        }

        fn overlap_test(&self, _: Vec3, _: Vec3, _: LayerMask) -> Vec<BlockId> {
            Vec::new()
        }

        fn bounds(&self, block: BlockId) -> Option<Bounds> {
            let x = block as f32;
            Some(Bounds {
                mins: Vec3::new(x - 0.1, 0.0, -0.1),
                maxs: Vec3::new(x + 0.1, 1.0, 0.1),
            })
        }
    }

    #[test]
    fn cyclic_backend_answers_are_survived() {
        let blocks = registry([cube(1, 1.0, 0), cube(2, 2.0, 0), cube(3, 3.0, 0)]);
        let report = TopologyEngine::default().compute(&blocks, None, &CyclicQuery);

        // Everything rests on something, so there is no base and nothing to walk.
        assert!(report.bases.is_empty());
        assert_eq!(report.tallest, 0);
        assert!(!report.is_forest());
    }

    #[test]
    fn forest_check_detects_two_cycles() {
        let report = TopologyReport {
            rests_on: BTreeMap::from([(1, 2), (2, 1), (3, 1)]),
            ..TopologyReport::default()
        };
        assert!(!report.is_forest());
    }

    /// Records sweep requests and forwards them to a real world.
    struct RecordingQuery<'a> {
        inner: &'a BlockQueryWorld,
        sweeps: RefCell<Vec<(Vec3, Vec3, Vec3, f32)>>,
    }

    impl SpatialQuery for RecordingQuery<'_> {
        fn sweep_test(
            &self,
            origin: Vec3,
            half_extents: Vec3,
            direction: Vec3,
            max_distance: f32,
            layers: LayerMask,
        ) -> Vec<SweepHit> {
            self.sweeps
                .borrow_mut()
                .push((origin, half_extents, direction, max_distance));
            self.inner
                .sweep_test(origin, half_extents, direction, max_distance, layers)
        }

        fn overlap_test(&self, center: Vec3, half_extents: Vec3, layers: LayerMask) -> Vec<BlockId> {
            self.inner.overlap_test(center, half_extents, layers)
        }

        fn bounds(&self, block: BlockId) -> Option<Bounds> {
            self.inner.bounds(block)
        }
    }

    #[test]
    fn single_block_issues_one_down_and_one_up_sweep() {
        let blocks = registry([cube(1, 0.0, 0)]);
        let world = BlockQueryWorld::from_registry(&blocks, 64);
        let query = RecordingQuery {
            inner: &world,
            sweeps: RefCell::new(Vec::new()),
        };

        TopologyEngine::default().compute(&blocks, None, &query);

        let sweeps = query.sweeps.into_inner();
        assert_eq!(sweeps.len(), 2);

        let (down_origin, footprint, down_dir, down_dist) = sweeps[0];
        assert!((down_origin - Vec3::new(0.0, 0.01, 0.0)).norm() < 1.0e-4);
        assert!((footprint - Vec3::new(0.225, 0.01, 0.225)).norm() < 1.0e-4);
        assert_eq!(down_dir, -Vec3::y());
        assert!((down_dist - 0.55).abs() < 1.0e-4);

        let (up_origin, _, up_dir, up_dist) = sweeps[1];
        assert!((up_origin - Vec3::new(0.0, 1.01, 0.0)).norm() < 1.0e-4);
        assert_eq!(up_dir, Vec3::y());
        assert!((up_dist - 1.05).abs() < 1.0e-4);
    }
}
