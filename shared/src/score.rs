//! Authoritative score and its replication channel.
//!
//! The host is the only writer. Every changed value is pushed, in order, to every live
//! subscription. Dropping a [`ScoreSubscription`] unsubscribes it; the dead sender is pruned on
//! the next publish.

use std::sync::mpsc::{self, Receiver, Sender};

/// Host-owned score plus its subscribers.
#[derive(Debug, Default)]
pub struct ScoreChannel {
    value: u32,
    subscribers: Vec<Sender<u32>>,
}

impl ScoreChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current authoritative value.
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Register a listener. It first receives the current value, then every later change.
    pub fn subscribe(&mut self) -> ScoreSubscription {
        let (tx, rx) = mpsc::channel();
        // The receiver is alive right here, so this send cannot fail.
        let _ = tx.send(self.value);
        self.subscribers.push(tx);
        ScoreSubscription { rx, last: None }
    }

    /// Set the score. Returns `true` and notifies subscribers only when the value changed.
    pub fn publish(&mut self, value: u32) -> bool {
        if value == self.value {
            return false;
        }
        log::debug!("Score changed {} -> {}", self.value, value);
        self.value = value;
        self.subscribers.retain(|tx| tx.send(value).is_ok());
        true
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Receiving end held by a participant's score display.
#[derive(Debug)]
pub struct ScoreSubscription {
    rx: Receiver<u32>,
    last: Option<u32>,
}

impl ScoreSubscription {
    /// Every value received since the last call, oldest first.
    pub fn drain(&mut self) -> Vec<u32> {
        let values: Vec<u32> = self.rx.try_iter().collect();
        if let Some(v) = values.last() {
            self.last = Some(*v);
        }
        values
    }

    /// Latest known value, after draining anything pending.
    pub fn latest(&mut self) -> Option<u32> {
        self.drain();
        self.last
    }
}
