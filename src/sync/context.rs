//! Owned bundle of calculator, coordinator and hub

use std::{sync::Arc, time::Duration};

use super::{
    broadcaster::{Broadcaster, EventHub, DEFAULT_CHANNEL_CAPACITY},
    coordinator::{ThrottleCoordinator, DEFAULT_THROTTLE_INTERVAL},
    events::TimerUpdate,
};
use crate::{
    state::{Table, TableId},
    timer::{remaining_ms_at, Clock, SessionTiming, SystemClock, TimerCalculator, DEFAULT_CACHE_WINDOW},
};

/// Tunables for a [`TimerSyncContext`]
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub throttle_interval: Duration,
    pub cache_window: Duration,
    pub channel_capacity: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            throttle_interval: DEFAULT_THROTTLE_INTERVAL,
            cache_window: DEFAULT_CACHE_WINDOW,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Everything one dashboard needs to keep table timers in sync.
/// Independent contexts share no state.
pub struct TimerSyncContext {
    clock: Arc<dyn Clock>,
    calculator: TimerCalculator,
    hub: Arc<EventHub>,
    broadcaster: Broadcaster,
    coordinator: Arc<ThrottleCoordinator>,
}

impl TimerSyncContext {
    pub fn new(settings: SyncSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: SyncSettings, clock: Arc<dyn Clock>) -> Self {
        let hub = Arc::new(EventHub::new(settings.channel_capacity));
        let broadcaster = Broadcaster::new(hub.clone(), Arc::clone(&clock));
        let coordinator = Arc::new(ThrottleCoordinator::new(
            broadcaster.clone(),
            Arc::clone(&clock),
            settings.throttle_interval,
        ));

        Self {
            calculator: TimerCalculator::new(Arc::clone(&clock), settings.cache_window),
            clock,
            hub,
            broadcaster,
            coordinator,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Memoized remaining seconds for `timing` as of now
    pub fn remaining_seconds(&self, timing: &SessionTiming) -> f64 {
        self.calculator.remaining_for(timing)
    }

    pub fn throttled_broadcast_timer_update(&self, table_id: TableId, remaining_time_ms: f64, initial_time_ms: f64) {
        self.coordinator
            .throttled_broadcast_timer_update(table_id, remaining_time_ms, initial_time_ms);
    }

    pub fn batch_timer_updates(&self, updates: Vec<TimerUpdate>) {
        self.coordinator.batch_timer_updates(updates);
    }

    /// Publish a full snapshot followed by a forced status recompute
    pub fn announce_table(&self, table: &Table) {
        let timing = &table.session;
        let remaining_ms = remaining_ms_at(timing, self.clock.now_ms());
        self.broadcaster.broadcast_table_update(table.id, table);
        self.broadcaster.force_table_status_update(
            table.id,
            remaining_ms,
            timing.initial_time_ms(),
            table.is_active,
        );
    }
}

impl Default for TimerSyncContext {
    fn default() -> Self {
        Self::new(SyncSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::DateTime;

    use super::*;
    use crate::{
        sync::events::{TimerEvent, Topic},
        timer::ManualClock,
    };

    #[test]
    fn contexts_do_not_share_subscribers() {
        let first = TimerSyncContext::default();
        let second = TimerSyncContext::default();
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        let _subscription = first.hub().subscribe(Topic::TimerUpdate, move |_| {
            *counter.lock().unwrap() += 1;
        });

        second.broadcaster().broadcast_timer_update(1, 0.0, 0.0);
        assert_eq!(*seen.lock().unwrap(), 0);

        first.broadcaster().broadcast_timer_update(1, 0.0, 0.0);
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn announce_publishes_snapshot_then_status() {
        let start = DateTime::from_timestamp(1_715_000_000, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start + chrono::Duration::seconds(3601)));
        let context = TimerSyncContext::with_clock(SyncSettings::default(), clock);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriptions: Vec<_> = [Topic::TableUpdate, Topic::TableStatusUpdate]
            .into_iter()
            .map(|topic| {
                let seen = Arc::clone(&seen);
                context
                    .hub()
                    .subscribe(topic, move |event| seen.lock().unwrap().push(event.clone()))
            })
            .collect();

        let mut table = Table::new(3, "Table 3", start);
        table.is_active = true;
        table.session = SessionTiming {
            duration_seconds: 3600.0,
            start_time: Some(start),
            ..SessionTiming::default()
        };
        context.announce_table(&table);
        drop(subscriptions);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].topic(), Topic::TableUpdate);
        match &seen[1] {
            TimerEvent::Status(status) => {
                assert_eq!(status.remaining_time_ms, -1000.0);
                assert!(status.is_active);
            }
            other => panic!("expected a status update, got {other:?}"),
        }
    }
}
