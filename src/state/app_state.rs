//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::warn;

use super::{
    table::{Table, TableDetails, TableRegistry},
    TableId, TickerState,
};
use crate::{config::Config, error::TableError, sync::TimerSyncContext};

/// Main application state that owns the table registry and the sync context
pub struct AppState {
    /// Timer calculation and broadcasting for this dashboard
    pub sync: TimerSyncContext,
    pub tables: TableRegistry,
    /// Ticker configuration
    pub tick_interval: Duration,
    pub per_table_updates: bool,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Channel for ticker updates
    pub ticker_tx: watch::Sender<TickerState>,
    /// Keep the receiver alive to prevent channel closure
    pub _ticker_rx: watch::Receiver<TickerState>,
}

impl AppState {
    /// Create a new AppState from CLI configuration with seeded tables
    pub fn new(config: &Config) -> Self {
        Self::with_context(config, TimerSyncContext::new(config.sync_settings()))
    }

    /// Create a new AppState around an existing sync context
    pub fn with_context(config: &Config, sync: TimerSyncContext) -> Self {
        let (ticker_tx, ticker_rx) = watch::channel(TickerState::new());
        let tables = TableRegistry::seeded(config.tables, sync.clock().now());

        Self {
            sync,
            tables,
            tick_interval: config.tick_interval(),
            per_table_updates: config.per_table,
            start_time: Instant::now(),
            port: config.port,
            host: config.host.clone(),
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            ticker_tx,
            _ticker_rx: ticker_rx,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.sync.clock().now()
    }

    /// Apply a registry change, record it and announce the new snapshot
    pub fn update_table<F>(&self, action: &str, id: TableId, change: F) -> Result<Table, TableError>
    where
        F: FnOnce(&TableRegistry, DateTime<Utc>) -> Result<Table, TableError>,
    {
        let now = self.now();
        let table = change(&self.tables, now)?;

        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(format!("{} table {}", action, id));
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(now);
        }

        self.sync.announce_table(&table);
        Ok(table)
    }

    pub fn start_session(&self, id: TableId, duration_seconds: f64) -> Result<Table, TableError> {
        self.update_table("start", id, |tables, now| {
            tables.start_session(id, duration_seconds, now)
        })
    }

    pub fn pause(&self, id: TableId) -> Result<Table, TableError> {
        self.update_table("pause", id, |tables, now| tables.pause(id, now))
    }

    pub fn resume(&self, id: TableId) -> Result<Table, TableError> {
        self.update_table("resume", id, |tables, now| tables.resume(id, now))
    }

    pub fn add_time(&self, id: TableId, delta_seconds: f64) -> Result<Table, TableError> {
        self.update_table("add-time", id, |tables, now| {
            tables.add_time(id, delta_seconds, now)
        })
    }

    pub fn update_details(&self, id: TableId, details: TableDetails) -> Result<Table, TableError> {
        self.update_table("update", id, |tables, now| {
            tables.update_details(id, details, now)
        })
    }

    pub fn end_session(&self, id: TableId) -> Result<Table, TableError> {
        self.update_table("end", id, |tables, now| tables.end_session(id, now))
    }

    /// Get current ticker state
    pub fn get_ticker_state(&self) -> TickerState {
        self.ticker_tx.borrow().clone()
    }

    /// Publish the result of a ticker pass
    pub fn update_ticker_state(&self, ticker_state: TickerState) {
        if let Err(e) = self.ticker_tx.send(ticker_state) {
            warn!("Failed to send ticker update: {}", e);
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
