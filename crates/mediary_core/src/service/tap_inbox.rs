//! Inbound queue of host tap events.
//!
//! # Responsibility
//! - Accept taps from any host dispatch thread.
//! - Drain queued taps through the counter service in arrival order.
//!
//! # Invariants
//! - Unknown host actions are rejected before they reach the queue.
//! - Draining never blocks waiting for new taps.

use crate::model::clock::Clock;
use crate::model::water::{DisplayInstanceId, TapDirection, TapEvent};
use crate::repo::counter_store::CounterStore;
use crate::service::counter_sync::{CounterError, CounterResult, CounterSyncService, DisplayHost};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use log::{error, warn};

/// Outcome counts for one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: usize,
    pub failed: usize,
}

/// Queue of pending taps.
pub struct TapInbox {
    tx: Sender<TapEvent>,
    rx: Receiver<TapEvent>,
}

/// Cloneable producer handle for host dispatch threads.
#[derive(Clone)]
pub struct TapSender {
    tx: Sender<TapEvent>,
}

impl TapInbox {
    pub fn unbounded() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Creates a queue that rejects taps once `capacity` are pending.
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    pub fn sender(&self) -> TapSender {
        TapSender {
            tx: self.tx.clone(),
        }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Handles every queued tap and returns how many succeeded.
    ///
    /// A failed tap is logged and counted; later taps are still handled.
    pub fn drain<S: CounterStore, C: Clock>(
        &self,
        service: &CounterSyncService<S, C>,
        host: &dyn DisplayHost,
    ) -> DrainReport {
        let mut report = DrainReport::default();
        while let Ok(event) = self.rx.try_recv() {
            match service.handle_tap(event, host) {
                Ok(_) => report.applied += 1,
                Err(err) => {
                    warn!(
                        "event=tap_dispatch module=inbox status=error direction={} error={}",
                        event.direction.label(),
                        err
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

impl Default for TapInbox {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl TapSender {
    /// Queues a tap. Returns `false` when the queue is full.
    pub fn send(&self, event: TapEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "event=tap_dispatch module=inbox status=dropped direction={} error_code=queue_full",
                    event.direction.label()
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Parses a host action string and queues the tap.
    ///
    /// # Errors
    /// - `UnknownDirection` when `action` is not a widget action. This is a
    ///   host contract violation; nothing is queued.
    pub fn send_action(&self, action: &str, target: DisplayInstanceId) -> CounterResult<bool> {
        let event = parse_tap(action, target)?;
        Ok(self.send(event))
    }
}

/// Converts a host action string into a tap event.
pub fn parse_tap(action: &str, target: DisplayInstanceId) -> CounterResult<TapEvent> {
    match TapDirection::from_action(action) {
        Some(direction) => Ok(TapEvent::new(direction, target)),
        None => {
            error!(
                "event=tap_dispatch module=inbox status=error error_code=unknown_direction action_len={}",
                action.len()
            );
            Err(CounterError::UnknownDirection(action.to_string()))
        }
    }
}
