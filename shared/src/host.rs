//! In-process host loop.
//!
//! [`HostSession`] wires the registry, the topology engine, the score pipeline and the score
//! channel together behind one serialized entry point, [`HostSession::update`]. Each call runs:
//! 1. every queued notification, in arrival order;
//! 2. the topology tick, when the accumulated time reached the check interval;
//! 3. every deferred release whose delay has elapsed.
//!
//! Nothing here is shared across threads: notifications from other participants are queued with
//! [`HostSession::enqueue`] and only take effect inside `update`.

use crate::{
    block::{BlockRegistry, TrackedBlock},
    pipeline::{DeferredRelease, ScorePipeline},
    score::{ScoreChannel, ScoreSubscription},
    session_log::{InteractionEvent, SessionInstant, SessionLogStore},
    settings::StackingSettings,
    spatial::SpatialQuery,
    topology::{TopologyEngine, TopologyReport},
    types::{BlockId, BlockNotification, InteractionKind, Quat, Vec3},
    zone::{StackingZone, ZoneEvent},
};
use std::{
    collections::VecDeque,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Wall clock source for event timestamps.
pub trait Clock {
    /// Microseconds since the Unix epoch.
    fn now_micros(&self) -> i64;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_micros(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
            .unwrap_or_default()
    }
}

pub struct HostSession<S, C = SystemClock> {
    settings: StackingSettings,
    clock: C,
    session_start_micros: i64,

    registry: BlockRegistry,
    zone: Option<StackingZone>,
    engine: TopologyEngine,
    pipeline: ScorePipeline<S>,
    score: ScoreChannel,
    last_report: TopologyReport,

    inbound: VecDeque<BlockNotification>,
    pending_releases: VecDeque<DeferredRelease>,

    elapsed: Duration,
    since_tick: Duration,
}

impl<S: SessionLogStore, C: Clock> HostSession<S, C> {
    /// Start a session. `store == None` runs without a session log; every event is dropped.
    pub fn new(settings: StackingSettings, store: Option<S>, clock: C) -> Self {
        let session_start_micros = clock.now_micros();
        log::info!("Session started at {session_start_micros}");

        Self {
            engine: TopologyEngine::new(settings.clone()),
            pipeline: ScorePipeline::host(store, &settings),
            settings,
            clock,
            session_start_micros,
            registry: BlockRegistry::new(),
            zone: None,
            score: ScoreChannel::new(),
            last_report: TopologyReport::default(),
            inbound: VecDeque::new(),
            pending_releases: VecDeque::new(),
            elapsed: Duration::ZERO,
            since_tick: Duration::ZERO,
        }
    }

    /// Only count blocks inside `zone`. Membership is refreshed from overlaps every tick.
    pub fn with_zone(mut self, zone: StackingZone) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn settings(&self) -> &StackingSettings {
        &self.settings
    }

    pub fn session_start_micros(&self) -> i64 {
        self.session_start_micros
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn zone(&self) -> Option<&StackingZone> {
        self.zone.as_ref()
    }

    pub fn pipeline(&self) -> &ScorePipeline<S> {
        &self.pipeline
    }

    /// Authoritative score as of the last tick.
    pub fn score(&self) -> u32 {
        self.score.value()
    }

    pub fn last_report(&self) -> &TopologyReport {
        &self.last_report
    }

    pub fn pending_releases(&self) -> usize {
        self.pending_releases.len()
    }

    pub fn subscribe(&mut self) -> ScoreSubscription {
        self.score.subscribe()
    }

    pub fn register_block(&mut self, block: TrackedBlock) {
        log::debug!("Tracking block {} ({})", block.id, block.name);
        self.registry.insert(block);
    }

    /// Physics sample for one block.
    pub fn report_motion(&mut self, id: BlockId, position: Vec3, rotation: Quat, linear_speed: f32) {
        self.registry.update_motion(id, position, rotation, linear_speed);
    }

    /// Queue a notification from any participant, the host included.
    pub fn enqueue(&mut self, notification: BlockNotification) {
        self.inbound.push_back(notification);
    }

    /// Advance the session by `dt`.
    ///
    /// `query` must describe the scene as of this frame. Returns every event recorded during
    /// the call, in order.
    pub fn update(&mut self, dt: Duration, query: &impl SpatialQuery) -> Vec<InteractionEvent> {
        self.elapsed += dt;
        self.since_tick += dt;

        let mut recorded = Vec::new();

        while let Some(notification) = self.inbound.pop_front() {
            recorded.extend(self.handle(notification));
        }

        let interval = self.settings.check_interval();
        if self.since_tick >= interval {
            self.since_tick -= interval;
            if self.since_tick >= interval {
                // Topology is rebuilt from scratch, so a backlog of ticks adds nothing.
                log::debug!("Dropping {:?} of tick backlog", self.since_tick);
                self.since_tick = Duration::ZERO;
            }
            self.tick(query);
        }

        while self
            .pending_releases
            .front()
            .is_some_and(|d| d.is_due(self.elapsed))
        {
            let Some(deferred) = self.pending_releases.pop_front() else {
                break;
            };
            let at = self.now();
            recorded.extend(self.pipeline.confirm_release(&deferred, self.score.value(), at));
        }

        recorded
    }

    /// Recompute topology and publish the tallest tower.
    pub fn tick(&mut self, query: &impl SpatialQuery) {
        if let Some(zone) = self.zone.as_mut() {
            for event in zone.refresh(query) {
                match event {
                    ZoneEvent::Entered(id) => log::debug!("Block {id} entered the stacking zone"),
                    ZoneEvent::Exited(id) => log::debug!("Block {id} left the stacking zone"),
                }
            }
        }

        let report = self.engine.compute(&self.registry, self.zone.as_ref(), query);

        for block in self.registry.iter_mut() {
            let stacked = report.is_stacked(block.id);
            if block.stacked != stacked {
                log::debug!(
                    "{} {}",
                    block.name,
                    if stacked { "stacked" } else { "unstacked" }
                );
                block.stacked = stacked;
            }
        }

        self.score.publish(report.tallest);
        self.last_report = report;
    }

    fn now(&self) -> SessionInstant {
        SessionInstant {
            wall_clock_micros: self.clock.now_micros(),
            session_time: self.elapsed,
        }
    }

    fn handle(&mut self, notification: BlockNotification) -> Option<InteractionEvent> {
        let applied = match self.registry.apply(&notification) {
            Ok(applied) => applied,
            Err(e) => {
                log::warn!("Rejected {} from actor {}: {e}", notification.kind, notification.actor);
                return None;
            }
        };

        let block_name = self
            .registry
            .get(applied.block)
            .map_or_else(|| format!("Block_{}", applied.block), |b| b.name.clone());
        let at = self.now();

        match applied.kind {
            InteractionKind::Grabbed => {
                self.pipeline
                    .on_grabbed(&applied, &block_name, self.score.value(), at)
            }
            InteractionKind::Released => {
                if let Some(deferred) = self.pipeline.on_released(&applied, &block_name, at) {
                    self.pending_releases.push_back(deferred);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::GrabState, rapier_world::BlockQueryWorld, session_log::MemoryLogStore,
    };

    const FRAME: Duration = Duration::from_millis(100);

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_micros(&self) -> i64 {
            self.0
        }
    }

    fn cube(id: BlockId, x: f32, level: u32) -> TrackedBlock {
        TrackedBlock::new(
            id,
            format!("Block_{id}"),
            Vec3::new(x, 0.5 + level as f32, 0.0),
            Vec3::new(0.5, 0.5, 0.5),
        )
    }

    fn session(blocks: impl IntoIterator<Item = TrackedBlock>) -> HostSession<MemoryLogStore, FixedClock> {
        let mut session = HostSession::new(
            StackingSettings::default(),
            Some(MemoryLogStore::new(7)),
            FixedClock(7),
        );
        blocks.into_iter().for_each(|b| session.register_block(b));
        session
    }

    fn three_stack() -> HostSession<MemoryLogStore, FixedClock> {
        session([cube(1, 0.0, 0), cube(2, 0.0, 1), cube(3, 0.0, 2)])
    }

    /// One frame against a fresh snapshot of the session's own blocks.
    fn step<S: SessionLogStore, C: Clock>(session: &mut HostSession<S, C>) -> Vec<InteractionEvent> {
        let world = BlockQueryWorld::from_registry(session.registry(), 64);
        session.update(FRAME, &world)
    }

    fn grab(block: BlockId, actor: u64) -> BlockNotification {
        BlockNotification {
            kind: InteractionKind::Grabbed,
            actor,
            block,
            position: Vec3::zeros(),
        }
    }

    fn release(block: BlockId, actor: u64, position: Vec3) -> BlockNotification {
        BlockNotification {
            kind: InteractionKind::Released,
            actor,
            block,
            position,
        }
    }

    fn logged(session: &HostSession<MemoryLogStore, FixedClock>) -> Vec<(InteractionKind, u32)> {
        session
            .pipeline()
            .store()
            .map(|s| s.events().iter().map(|e| (e.action, e.score)).collect())
            .unwrap_or_default()
    }

    #[test]
    fn settled_three_stack_scores_three() {
        let mut session = three_stack();
        let mut sub = session.subscribe();

        step(&mut session);

        assert_eq!(session.score(), 3);
        assert_eq!(sub.drain(), vec![0, 3]);
        assert!(session.registry().get(3).is_some_and(|b| b.stacked));
        assert!(session.registry().get(1).is_some_and(|b| !b.stacked));
    }

    #[test]
    fn no_tick_before_the_check_interval() {
        let mut session = three_stack();
        let world = BlockQueryWorld::from_registry(session.registry(), 64);

        session.update(Duration::from_millis(60), &world);
        assert_eq!(session.score(), 0);

        session.update(Duration::from_millis(40), &world);
        assert_eq!(session.score(), 3);
    }

    #[test]
    fn grabbing_the_top_block_drops_the_score_within_one_tick() {
        let mut session = three_stack();
        step(&mut session);

        session.enqueue(grab(3, 1));
        let events = step(&mut session);

        // The grab is logged against the pre-movement score.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].score, 3);
        assert_eq!(events[0].block_name, "Block_3");
        assert_eq!(session.score(), 2);
        assert_eq!(
            session.registry().get(3).map(|b| (b.grab, b.stacked)),
            Some((GrabState::Held(1), false))
        );
    }

    #[test]
    fn release_back_onto_the_stack_logs_the_settled_score() {
        let mut session = three_stack();
        step(&mut session);
        session.enqueue(grab(3, 1));
        step(&mut session);

        session.enqueue(release(3, 1, Vec3::new(0.0, 2.5, 0.0)));
        assert!(step(&mut session).is_empty());
        assert_eq!(session.pending_releases(), 1);
        assert_eq!(session.score(), 3);

        assert!(step(&mut session).is_empty());
        let events = step(&mut session);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, InteractionKind::Released);
        assert_eq!(events[0].score, 3);
        assert_eq!(events[0].position.y, 2.5);
        assert_eq!(session.pending_releases(), 0);
        assert_eq!(
            logged(&session),
            vec![(InteractionKind::Grabbed, 3), (InteractionKind::Released, 3)]
        );
    }

    #[test]
    fn two_independent_blocks_score_one() {
        let mut session = session([cube(1, 0.0, 0), cube(2, 4.0, 0)]);
        step(&mut session);
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn moving_block_above_another_is_ignored() {
        let mut session = session([cube(1, 0.0, 0), cube(2, 0.0, 1).with_speed(1.0)]);
        step(&mut session);

        assert_eq!(session.score(), 1);
        assert!(!session.last_report().eligible.contains(&2));
    }

    #[test]
    fn regrab_and_release_in_place_restores_topology() {
        let mut session = three_stack();
        step(&mut session);
        let before = session.last_report().clone();

        session.enqueue(grab(2, 4));
        step(&mut session);
        assert_eq!(session.score(), 1);

        session.enqueue(release(2, 4, Vec3::new(0.0, 1.5, 0.0)));
        step(&mut session);

        assert_eq!(session.last_report(), &before);
        assert_eq!(session.score(), 3);
    }

    #[test]
    fn deferred_release_still_fires_after_a_regrab() {
        let mut session = three_stack();
        step(&mut session);
        session.enqueue(grab(3, 1));
        step(&mut session);

        session.enqueue(release(3, 1, Vec3::new(0.0, 2.5, 0.0)));
        step(&mut session);
        session.enqueue(grab(3, 2));
        step(&mut session);
        step(&mut session);

        // The release is logged after the second grab, against the score with block 3 held again.
        assert_eq!(
            logged(&session),
            vec![
                (InteractionKind::Grabbed, 3),
                (InteractionKind::Grabbed, 3),
                (InteractionKind::Released, 2)
            ]
        );
    }

    #[test]
    fn grab_always_precedes_its_release_in_the_log() {
        let mut session = three_stack();
        step(&mut session);

        session.enqueue(grab(3, 1));
        session.enqueue(release(3, 1, Vec3::new(0.0, 2.5, 0.0)));
        for _ in 0..4 {
            step(&mut session);
        }

        let actions: Vec<_> = logged(&session).into_iter().map(|(a, _)| a).collect();
        assert_eq!(actions, vec![InteractionKind::Grabbed, InteractionKind::Released]);
    }

    #[test]
    fn rejected_transitions_record_nothing() {
        let mut session = three_stack();
        session.enqueue(release(1, 9, Vec3::zeros()));
        session.enqueue(grab(42, 9));
        session.enqueue(grab(2, 1));
        session.enqueue(grab(2, 5));

        let events = step(&mut session);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].player_id, 1);
        assert_eq!(session.pending_releases(), 0);
    }

    #[test]
    fn missing_session_log_still_scores() {
        let mut session: HostSession<MemoryLogStore, FixedClock> =
            HostSession::new(StackingSettings::default(), None, FixedClock(0));
        for b in [cube(1, 0.0, 0), cube(2, 0.0, 1)] {
            session.register_block(b);
        }

        session.enqueue(grab(2, 1));
        assert!(step(&mut session).is_empty());
        assert_eq!(session.score(), 1);
        assert!(session.pipeline().store().is_none());
    }

    #[test]
    fn zone_limits_counted_blocks() {
        let zone = StackingZone::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 3.0, 1.0));
        let mut session = session([
            cube(1, 0.0, 0),
            cube(2, 0.0, 1),
            cube(3, 5.0, 0),
            cube(4, 5.0, 1),
            cube(5, 5.0, 2),
        ])
        .with_zone(zone);

        step(&mut session);

        assert_eq!(session.score(), 2);
        assert!(session.zone().is_some_and(|z| z.contains(1) && !z.contains(3)));
    }

    #[test]
    fn every_subscriber_sees_every_score_in_order() {
        let mut session = three_stack();
        let mut a = session.subscribe();
        let mut b = session.subscribe();

        step(&mut session);
        session.enqueue(grab(3, 1));
        step(&mut session);
        session.enqueue(release(3, 1, Vec3::new(0.0, 2.5, 0.0)));
        step(&mut session);

        assert_eq!(a.drain(), vec![0, 3, 2, 3]);
        assert_eq!(b.drain(), vec![0, 3, 2, 3]);
    }

    #[test]
    fn motion_samples_feed_settlement() {
        let mut session = three_stack();
        session.report_motion(3, Vec3::new(0.0, 2.5, 0.0), Quat::identity(), 2.0);
        step(&mut session);
        assert_eq!(session.score(), 2);

        session.report_motion(3, Vec3::new(0.0, 2.5, 0.0), Quat::identity(), 0.0);
        step(&mut session);
        assert_eq!(session.score(), 3);
    }
}
