//! Authoritative event and score pipeline.
//!
//! Turns grab/release notifications into [`InteractionEvent`]s:
//! - "grabbed" is recorded immediately, against the score read at that instant.
//! - "released" is deferred by the settle delay and then recorded against whatever the score is
//!   by then, so the topology has a chance to re-settle first.
//!
//! Notes:
//! - Only a [`Authority::Host`] pipeline writes. A client pipeline accepts calls and drops them.
//! - A host without a store (session not initialized) warns and drops the event.
//! - A failed append is logged at error level and the event is lost. Nothing is retried.
//! - Deferred releases are never cancelled. The caller owns the pending [`DeferredRelease`]
//!   values and hands each back to [`ScorePipeline::confirm_release`] once it is due.

use crate::{
    session_log::{InteractionEvent, SessionInstant, SessionLogStore},
    settings::StackingSettings,
    types::BlockNotification,
};
use std::time::Duration;

/// Which side of the session this pipeline runs on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Authority {
    Host,
    Client,
}

/// A release waiting for the topology to settle before it is recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct DeferredRelease {
    /// Session time at which the release should be recorded.
    pub due_at: Duration,
    pub notification: BlockNotification,
    pub block_name: String,
}

impl DeferredRelease {
    pub fn is_due(&self, session_time: Duration) -> bool {
        session_time >= self.due_at
    }
}

#[derive(Debug)]
pub struct ScorePipeline<S> {
    authority: Authority,
    store: Option<S>,
    release_settle_delay: Duration,
}

impl<S: SessionLogStore> ScorePipeline<S> {
    /// Host pipeline writing to `store`. `None` means the session log was never initialized.
    pub fn host(store: Option<S>, settings: &StackingSettings) -> Self {
        Self {
            authority: Authority::Host,
            store,
            release_settle_delay: settings.release_settle_delay(),
        }
    }

    /// Non-host pipeline. It never records anything.
    pub fn client(settings: &StackingSettings) -> Self {
        Self {
            authority: Authority::Client,
            store: None,
            release_settle_delay: settings.release_settle_delay(),
        }
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    pub fn release_settle_delay(&self) -> Duration {
        self.release_settle_delay
    }

    /// Record a grab right away against the pre-movement `score`.
    pub fn on_grabbed(
        &mut self,
        notification: &BlockNotification,
        block_name: &str,
        score: u32,
        at: SessionInstant,
    ) -> Option<InteractionEvent> {
        self.record(notification, block_name, score, at)
    }

    /// Schedule the release record `release_settle_delay` after `at`.
    ///
    /// Returns `None` on a client, which has nothing to confirm later.
    pub fn on_released(
        &self,
        notification: &BlockNotification,
        block_name: &str,
        at: SessionInstant,
    ) -> Option<DeferredRelease> {
        if self.authority != Authority::Host {
            log::debug!(
                "Client pipeline ignoring release of {block_name} by {}",
                notification.actor
            );
            return None;
        }

        Some(DeferredRelease {
            due_at: at.session_time + self.release_settle_delay,
            notification: notification.clone(),
            block_name: block_name.to_owned(),
        })
    }

    /// Record a deferred release against the current, post-settle `score`.
    pub fn confirm_release(
        &mut self,
        deferred: &DeferredRelease,
        score: u32,
        at: SessionInstant,
    ) -> Option<InteractionEvent> {
        self.record(&deferred.notification, &deferred.block_name, score, at)
    }

    fn record(
        &mut self,
        notification: &BlockNotification,
        block_name: &str,
        score: u32,
        at: SessionInstant,
    ) -> Option<InteractionEvent> {
        if self.authority != Authority::Host {
            log::debug!(
                "Client pipeline ignoring {} of {block_name} by {}",
                notification.kind,
                notification.actor
            );
            return None;
        }

        let Some(store) = self.store.as_mut() else {
            log::warn!(
                "Session log not initialized, dropping {} of {block_name} by {}",
                notification.kind,
                notification.actor
            );
            return None;
        };

        let event = interaction_event(notification, block_name, score, at);
        if let Err(e) = store.append(event.clone()) {
            log::error!("Failed to persist {} of {block_name}: {e}", event.action);
            return None;
        }

        log::info!("{}", log_line(&event));
        Some(event)
    }
}

/// Build the persisted record for one transition.
pub fn interaction_event(
    notification: &BlockNotification,
    block_name: &str,
    score: u32,
    at: SessionInstant,
) -> InteractionEvent {
    InteractionEvent {
        timestamp_micros: at.wall_clock_micros,
        game_time: at.session_time.as_secs_f32(),
        player_id: notification.actor,
        block_id: notification.block,
        block_name: block_name.to_owned(),
        action: notification.kind,
        position: notification.position.into(),
        score,
    }
}

/// `"[LOG] <ts> Player <id> <action> <block> at (x, y, z)"`.
pub fn log_line(event: &InteractionEvent) -> String {
    let p = event.position;
    format!(
        "[LOG] {} Player {} {} {} at ({:.2}, {:.2}, {:.2})",
        event.timestamp_micros, event.player_id, event.action, event.block_name, p.x, p.y, p.z
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::LogStoreError,
        session_log::MemoryLogStore,
        types::{InteractionKind, Vec3},
    };

    fn at(ms: u64) -> SessionInstant {
        SessionInstant {
            wall_clock_micros: 1_000_000 + ms as i64 * 1000,
            session_time: Duration::from_millis(ms),
        }
    }

    fn notification(kind: InteractionKind) -> BlockNotification {
        BlockNotification {
            kind,
            actor: 5,
            block: 3,
            position: Vec3::new(0.0, 2.5, 0.0),
        }
    }

    fn host() -> ScorePipeline<MemoryLogStore> {
        ScorePipeline::host(Some(MemoryLogStore::new(1_000_000)), &StackingSettings::default())
    }

    struct FailingStore;

    impl SessionLogStore for FailingStore {
        fn append(&mut self, _event: InteractionEvent) -> Result<(), LogStoreError> {
            Err(LogStoreError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn grab_is_recorded_immediately_with_current_score() {
        let mut pipeline = host();
        let event = pipeline
            .on_grabbed(&notification(InteractionKind::Grabbed), "Block_3", 3, at(400))
            .expect("host records grabs");

        assert_eq!(event.score, 3);
        assert_eq!(event.action, InteractionKind::Grabbed);
        assert_eq!(event.player_id, 5);
        assert_eq!(event.timestamp_micros, 1_400_000);
        assert!((event.game_time - 0.4).abs() < 1e-6);
        assert_eq!(pipeline.store().map(|s| s.events().len()), Some(1));
    }

    #[test]
    fn release_is_deferred_by_settle_delay_and_uses_later_score() {
        let mut pipeline = host();
        let released = notification(InteractionKind::Released);

        let deferred = pipeline
            .on_released(&released, "Block_3", at(1000))
            .expect("host defers releases");
        assert_eq!(deferred.due_at, Duration::from_millis(1200));
        assert!(!deferred.is_due(Duration::from_millis(1100)));
        assert!(deferred.is_due(Duration::from_millis(1200)));
        // Nothing is written until confirmation.
        assert_eq!(pipeline.store().map(|s| s.events().len()), Some(0));

        let event = pipeline
            .confirm_release(&deferred, 3, at(1200))
            .expect("confirmation records");
        assert_eq!(event.score, 3);
        assert_eq!(event.action, InteractionKind::Released);
        assert_eq!(event.timestamp_micros, 2_200_000);
    }

    #[test]
    fn client_pipeline_never_writes() {
        let mut pipeline: ScorePipeline<MemoryLogStore> =
            ScorePipeline::client(&StackingSettings::default());

        assert_eq!(pipeline.authority(), Authority::Client);
        assert!(
            pipeline
                .on_grabbed(&notification(InteractionKind::Grabbed), "Block_3", 3, at(0))
                .is_none()
        );
        assert!(
            pipeline
                .on_released(&notification(InteractionKind::Released), "Block_3", at(0))
                .is_none()
        );
        assert!(pipeline.store().is_none());
    }

    #[test]
    fn missing_store_drops_events_without_failing() {
        let mut pipeline: ScorePipeline<MemoryLogStore> =
            ScorePipeline::host(None, &StackingSettings::default());

        let grabbed = notification(InteractionKind::Grabbed);
        assert!(pipeline.on_grabbed(&grabbed, "Block_3", 1, at(0)).is_none());
    }

    #[test]
    fn persistence_failure_is_not_fatal() {
        let mut pipeline = ScorePipeline::host(Some(FailingStore), &StackingSettings::default());

        let grabbed = notification(InteractionKind::Grabbed);
        assert!(pipeline.on_grabbed(&grabbed, "Block_3", 1, at(0)).is_none());
        // The pipeline keeps working afterward.
        assert!(pipeline.on_grabbed(&grabbed, "Block_3", 1, at(100)).is_none());
    }

    #[test]
    fn log_line_format() {
        let event = interaction_event(
            &notification(InteractionKind::Grabbed),
            "Block_3",
            2,
            at(0),
        );
        assert_eq!(
            log_line(&event),
            "[LOG] 1000000 Player 5 grabbed Block_3 at (0.00, 2.50, 0.00)"
        );
    }
}
