//! Ticker state published after every tick

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TableId;

/// Summary of the most recent ticker pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerState {
    pub last_tick: Option<DateTime<Utc>>,
    pub ticks: u64,
    pub active_tables: usize,
    /// Active tables whose remaining time is negative
    pub overtime_tables: Vec<TableId>,
}

impl TickerState {
    /// Create a ticker state that has not ticked yet
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overtime_count(&self) -> usize {
        self.overtime_tables.len()
    }
}
