//! Throttled and batched delivery of per-table timer ticks

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::{broadcaster::Broadcaster, events::TimerUpdate};
use crate::{state::TableId, timer::Clock};

/// Delay between the first pending update and the flush that delivers it
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(100);

/// Latest unflushed timer values for one table
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub table_id: TableId,
    pub remaining_time_ms: f64,
    pub initial_time_ms: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct PendingState {
    updates: BTreeMap<TableId, PendingUpdate>,
    flush_scheduled: bool,
}

/// Coalesces timer updates so each table is broadcast at most once per flush
pub struct ThrottleCoordinator {
    broadcaster: Broadcaster,
    clock: Arc<dyn Clock>,
    interval: Duration,
    pending: Mutex<PendingState>,
}

impl ThrottleCoordinator {
    pub fn new(broadcaster: Broadcaster, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            broadcaster,
            clock,
            interval,
            pending: Mutex::new(PendingState::default()),
        }
    }

    /// Record the latest values for `table_id` and make sure a flush is coming.
    /// Later calls for the same table before the flush overwrite earlier ones.
    pub fn throttled_broadcast_timer_update(
        self: &Arc<Self>,
        table_id: TableId,
        remaining_time_ms: f64,
        initial_time_ms: f64,
    ) {
        let needs_flush = {
            let mut pending = self.lock_pending();
            pending.updates.insert(
                table_id,
                PendingUpdate {
                    table_id,
                    remaining_time_ms,
                    initial_time_ms,
                    timestamp: self.clock.now(),
                },
            );
            !std::mem::replace(&mut pending.flush_scheduled, true)
        };

        if needs_flush {
            self.schedule_flush();
        }
    }

    /// Deliver a caller-assembled set of updates as a single notification
    pub fn batch_timer_updates(&self, updates: Vec<TimerUpdate>) {
        if updates.is_empty() {
            return;
        }
        debug!("Broadcasting batch of {} timer updates", updates.len());
        self.broadcaster.broadcast_batch(updates);
    }

    /// Broadcast every pending update and clear the pending set.
    /// Returns how many tables were broadcast.
    pub fn flush(&self) -> usize {
        let updates = {
            let mut pending = self.lock_pending();
            pending.flush_scheduled = false;
            std::mem::take(&mut pending.updates)
        };

        for update in updates.values() {
            self.broadcaster.broadcast_timer_update(
                update.table_id,
                update.remaining_time_ms,
                update.initial_time_ms,
            );
        }

        if !updates.is_empty() {
            debug!("Flushed timer updates for {} tables", updates.len());
        }
        updates.len()
    }

    pub fn pending_count(&self) -> usize {
        self.lock_pending().updates.len()
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.lock_pending().flush_scheduled
    }

    fn schedule_flush(self: &Arc<Self>) {
        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime available to defer timer flush, flushing immediately");
            self.flush();
            return;
        };

        let mut scheduled = ScheduledFlush {
            coordinator: Arc::clone(self),
            done: false,
        };
        handle.spawn(async move {
            tokio::time::sleep(scheduled.coordinator.interval).await;
            scheduled.coordinator.flush();
            scheduled.done = true;
        });
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingState> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Owned by a deferred flush task; re-arms scheduling if the task is dropped
/// before it gets to flush (runtime shutdown)
struct ScheduledFlush {
    coordinator: Arc<ThrottleCoordinator>,
    done: bool,
}

impl Drop for ScheduledFlush {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut pending = self.coordinator.lock_pending();
        pending.flush_scheduled = false;
        warn!(
            "Deferred timer flush cancelled with {} tables pending",
            pending.updates.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sync::{
            broadcaster::{EventHub, Subscription},
            events::{TimerEvent, Topic},
        },
        timer::SystemClock,
    };

    struct Harness {
        coordinator: Arc<ThrottleCoordinator>,
        seen: Arc<Mutex<Vec<TimerEvent>>>,
        _subscriptions: Vec<Subscription>,
    }

    fn harness() -> Harness {
        let hub = Arc::new(EventHub::default());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriptions = [Topic::TimerUpdate, Topic::BatchTimerUpdate]
            .into_iter()
            .map(|topic| {
                let seen = Arc::clone(&seen);
                hub.subscribe(topic, move |event| seen.lock().unwrap().push(event.clone()))
            })
            .collect();
        let broadcaster = Broadcaster::new(hub, Arc::clone(&clock));
        Harness {
            coordinator: Arc::new(ThrottleCoordinator::new(
                broadcaster,
                clock,
                DEFAULT_THROTTLE_INTERVAL,
            )),
            seen,
            _subscriptions: subscriptions,
        }
    }

    fn timer_updates(seen: &Mutex<Vec<TimerEvent>>) -> Vec<TimerUpdate> {
        seen.lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                TimerEvent::Timer(update) => Some(update.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn coalesces_repeated_updates_to_latest_value() {
        let h = harness();
        for remaining in [5000.0, 4000.0, 3000.0, 2000.0, 1000.0] {
            h.coordinator.throttled_broadcast_timer_update(7, remaining, 60_000.0);
        }
        assert_eq!(h.coordinator.pending_count(), 1);
        assert!(h.seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;

        let updates = timer_updates(&h.seen);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].table_id, 7);
        assert_eq!(updates[0].remaining_time_ms, 1000.0);
        assert!(!h.coordinator.is_flush_scheduled());
        assert_eq!(h.coordinator.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tables_share_one_flush() {
        let h = harness();
        h.coordinator.throttled_broadcast_timer_update(1, 10_000.0, 60_000.0);
        h.coordinator.throttled_broadcast_timer_update(2, 20_000.0, 60_000.0);
        h.coordinator.throttled_broadcast_timer_update(1, 9_000.0, 60_000.0);

        tokio::time::sleep(Duration::from_millis(150)).await;

        let updates = timer_updates(&h.seen);
        let ids: Vec<_> = updates.iter().map(|u| u.table_id).collect();
        assert_eq!(ids, [1, 2]);
        assert_eq!(updates[0].remaining_time_ms, 9_000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_broadcast_before_the_window_ends() {
        let h = harness();
        h.coordinator.throttled_broadcast_timer_update(3, 1.0, 2.0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(timer_updates(&h.seen).is_empty());
        assert!(h.coordinator.is_flush_scheduled());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(timer_updates(&h.seen).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn later_updates_start_a_new_window() {
        let h = harness();
        h.coordinator.throttled_broadcast_timer_update(4, 3000.0, 5000.0);
        tokio::time::sleep(Duration::from_millis(150)).await;
        h.coordinator.throttled_broadcast_timer_update(4, 2000.0, 5000.0);
        tokio::time::sleep(Duration::from_millis(150)).await;

        let remaining: Vec<_> = timer_updates(&h.seen)
            .iter()
            .map(|u| u.remaining_time_ms)
            .collect();
        assert_eq!(remaining, [3000.0, 2000.0]);
    }

    #[test]
    fn flushes_inline_without_a_runtime() {
        let h = harness();
        h.coordinator.throttled_broadcast_timer_update(5, 1.0, 2.0);
        assert_eq!(timer_updates(&h.seen).len(), 1);
        assert!(!h.coordinator.is_flush_scheduled());
    }

    #[test]
    fn cancelled_flush_does_not_block_later_flushes() {
        let h = harness();

        let first = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        first.block_on(async {
            h.coordinator.throttled_broadcast_timer_update(1, 5000.0, 60_000.0);
        });
        assert!(h.coordinator.is_flush_scheduled());
        drop(first);
        assert!(!h.coordinator.is_flush_scheduled());
        assert_eq!(h.coordinator.pending_count(), 1);

        let second = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        second.block_on(async {
            h.coordinator.throttled_broadcast_timer_update(2, 4000.0, 60_000.0);
            tokio::time::sleep(Duration::from_millis(300)).await;
        });

        let ids: Vec<_> = timer_updates(&h.seen).iter().map(|u| u.table_id).collect();
        assert_eq!(ids, [1, 2]);
        assert_eq!(h.coordinator.pending_count(), 0);
        assert!(!h.coordinator.is_flush_scheduled());
    }

    #[test]
    fn batch_is_one_notification() {
        let h = harness();
        h.coordinator.batch_timer_updates(vec![
            TimerUpdate {
                table_id: 1,
                remaining_time_ms: 1000.0,
                initial_time_ms: 2000.0,
            },
            TimerUpdate {
                table_id: 2,
                remaining_time_ms: -500.0,
                initial_time_ms: 2000.0,
            },
        ]);
        h.coordinator.batch_timer_updates(Vec::new());

        let seen = h.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        match &seen[0] {
            TimerEvent::Batch(batch) => {
                let ids: Vec<_> = batch.updates.iter().map(|u| u.table_id).collect();
                assert_eq!(ids, [1, 2]);
            }
            other => panic!("expected a batch, got {other:?}"),
        }
    }
}
