//! Table ticker background task

use std::{collections::BTreeSet, sync::Arc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::{
    error::TableError,
    state::{AppState, TableId, TickerState},
    sync::TimerUpdate,
    timer::{format_time, remaining_ms_at},
};

/// Background task that recomputes every active table's remaining time on each tick
pub async fn table_ticker_task(state: Arc<AppState>) {
    info!(
        "Starting table ticker every {:?} ({} updates)",
        state.tick_interval,
        if state.per_table_updates { "per-table" } else { "batched" }
    );

    let mut interval = tokio::time::interval(state.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut overtime = BTreeSet::new();
    let mut ticks = 0u64;

    loop {
        interval.tick().await;
        ticks += 1;

        match run_tick(&state, &mut overtime, ticks) {
            Ok(ticker_state) => state.update_ticker_state(ticker_state),
            Err(e) => error!("Table tick failed: {}", e),
        }
    }
}

/// One ticker pass: every table is measured against the same instant, then the
/// results go out as one batch or through the per-table throttle
pub fn run_tick(
    state: &AppState,
    overtime: &mut BTreeSet<TableId>,
    ticks: u64,
) -> Result<TickerState, TableError> {
    let now = state.now();
    let now_ms = now.timestamp_millis();
    let active = state.tables.active()?;

    let updates: Vec<TimerUpdate> = active
        .iter()
        .map(|table| TimerUpdate {
            table_id: table.id,
            remaining_time_ms: remaining_ms_at(&table.session, now_ms),
            initial_time_ms: table.session.initial_time_ms(),
        })
        .collect();

    overtime.retain(|id| active.iter().any(|table| table.id == *id));
    for update in &updates {
        if update.remaining_time_ms < 0.0 {
            if overtime.insert(update.table_id) {
                info!(
                    "Table {} is in overtime ({})",
                    update.table_id,
                    format_time(update.remaining_time_ms)
                );
            }
        } else {
            overtime.remove(&update.table_id);
        }
    }

    debug!("Tick {}: {} active tables", ticks, updates.len());

    let active_tables = updates.len();
    if state.per_table_updates {
        for update in &updates {
            state.sync.throttled_broadcast_timer_update(
                update.table_id,
                update.remaining_time_ms,
                update.initial_time_ms,
            );
        }
    } else {
        state.sync.batch_timer_updates(updates);
    }

    Ok(TickerState {
        last_tick: Some(now),
        ticks,
        active_tables,
        overtime_tables: overtime.iter().copied().collect(),
    })
}
