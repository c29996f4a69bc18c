//! Remaining-time derivation with short-lived memoization

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::{
    clock::Clock,
    session::{RawSessionTiming, SessionTiming},
};

/// How long a memoized result is served before it is recomputed
pub const DEFAULT_CACHE_WINDOW: Duration = Duration::from_millis(100);
/// Chance that a lookup also sweeps stale entries
const SWEEP_PROBABILITY: f64 = 0.01;
/// Hard ceiling on cached entries, reaching it forces a sweep
const MAX_CACHE_ENTRIES: usize = 512;

/// Compute signed remaining milliseconds against an explicit "now".
///
/// A session that has not started returns `initial_time_ms` untouched. While
/// paused the current segment ends at `pause`, falling back to `now_ms` when no
/// pause instant was recorded. The result is never clamped: a negative value
/// is overtime.
pub fn calculate_remaining_time_on_the_fly(
    initial_time_ms: f64,
    start: Option<DateTime<Utc>>,
    is_paused: bool,
    pause: Option<DateTime<Utc>>,
    accumulated_seconds: f64,
    now_ms: i64,
) -> f64 {
    let Some(start) = start else {
        return initial_time_ms;
    };

    let segment_end_ms = match (is_paused, pause) {
        (true, Some(pause)) => pause.timestamp_millis(),
        _ => now_ms,
    };
    let elapsed_ms = (segment_end_ms - start.timestamp_millis()) as f64;

    initial_time_ms - (elapsed_ms + accumulated_seconds * 1000.0)
}

/// Explicit-clock variant taking a [`SessionTiming`]
pub fn remaining_ms_at(timing: &SessionTiming, now_ms: i64) -> f64 {
    calculate_remaining_time_on_the_fly(
        timing.initial_time_ms(),
        timing.start_time,
        timing.is_paused,
        timing.pause_time,
        timing.accumulated_seconds,
        now_ms,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    duration_bits: u64,
    start: Option<DateTime<Utc>>,
    is_paused: bool,
    pause: Option<DateTime<Utc>>,
    accumulated_bits: u64,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    remaining_seconds: f64,
    computed_at: DateTime<Utc>,
}

/// Remaining-time calculator reading "now" from an injected clock
pub struct TimerCalculator {
    clock: Arc<dyn Clock>,
    window: chrono::Duration,
    cache: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl TimerCalculator {
    pub fn new(clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            clock,
            window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Signed seconds remaining as of the clock's current instant.
    ///
    /// Identical inputs within the cache window return the value computed the
    /// first time.
    pub fn calculate_remaining_time(
        &self,
        duration_seconds: f64,
        start: Option<DateTime<Utc>>,
        is_paused: bool,
        pause: Option<DateTime<Utc>>,
        accumulated_seconds: f64,
    ) -> f64 {
        if start.is_none() {
            return duration_seconds;
        }

        let now = self.clock.now();
        let key = CacheKey {
            duration_bits: duration_seconds.to_bits(),
            start,
            is_paused,
            pause,
            accumulated_bits: accumulated_seconds.to_bits(),
        };

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        self.maybe_sweep(&mut cache, now);

        if let Some(entry) = cache.get(&key) {
            if self.is_fresh(entry, now) {
                trace!("Serving memoized remaining time");
                return entry.remaining_seconds;
            }
        }

        let remaining_seconds = calculate_remaining_time_on_the_fly(
            duration_seconds * 1000.0,
            start,
            is_paused,
            pause,
            accumulated_seconds,
            now.timestamp_millis(),
        ) / 1000.0;

        cache.insert(
            key,
            CacheEntry {
                remaining_seconds,
                computed_at: now,
            },
        );
        remaining_seconds
    }

    pub fn remaining_for(&self, timing: &SessionTiming) -> f64 {
        self.calculate_remaining_time(
            timing.duration_seconds,
            timing.start_time,
            timing.is_paused,
            timing.pause_time,
            timing.accumulated_seconds,
        )
    }

    /// Remaining seconds for a record whose timestamps have not been validated.
    /// `None` means the record could not be interpreted.
    pub fn remaining_from_raw(&self, raw: &RawSessionTiming) -> Option<f64> {
        match SessionTiming::try_from(raw) {
            Ok(timing) => Some(self.remaining_for(&timing)),
            Err(e) => {
                debug!("Remaining time unknown: {}", e);
                None
            }
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let age = now - entry.computed_at;
        age >= chrono::Duration::zero() && age < self.window
    }

    fn maybe_sweep(&self, cache: &mut HashMap<CacheKey, CacheEntry>, now: DateTime<Utc>) {
        let full = cache.len() >= MAX_CACHE_ENTRIES;
        if !full && rand::random::<f64>() >= SWEEP_PROBABILITY {
            return;
        }

        let before = cache.len();
        cache.retain(|_, entry| self.is_fresh(entry, now));
        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }
        trace!("Swept timer cache: {} -> {} entries", before, cache.len());
    }
}
