//! Named notifications emitted by the broadcaster

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{Table, TableId};

/// Topic a notification is published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    TimerUpdate,
    TableUpdate,
    TableStatusUpdate,
    BatchTimerUpdate,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::TimerUpdate,
        Topic::TableUpdate,
        Topic::TableStatusUpdate,
        Topic::BatchTimerUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::TimerUpdate => "timer-update",
            Topic::TableUpdate => "table-update",
            Topic::TableStatusUpdate => "table-status-update",
            Topic::BatchTimerUpdate => "batch-timer-update",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest timer values for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerUpdate {
    pub table_id: TableId,
    pub remaining_time_ms: f64,
    pub initial_time_ms: f64,
}

/// Full table snapshot, authoritative over any timer-only update
#[derive(Debug, Clone, Serialize)]
pub struct TableUpdate {
    pub table_id: TableId,
    pub table: Table,
}

/// Forces dependent visual state (warning bands) to recompute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStatusUpdate {
    pub table_id: TableId,
    pub remaining_time_ms: f64,
    pub initial_time_ms: f64,
    pub is_active: bool,
    pub timestamp: DateTime<Utc>,
}

/// Timer values for many tables delivered together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTimerUpdate {
    pub updates: Vec<TimerUpdate>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum TimerEvent {
    Timer(TimerUpdate),
    Table(TableUpdate),
    Status(TableStatusUpdate),
    Batch(BatchTimerUpdate),
}

impl TimerEvent {
    pub fn topic(&self) -> Topic {
        match self {
            TimerEvent::Timer(_) => Topic::TimerUpdate,
            TimerEvent::Table(_) => Topic::TableUpdate,
            TimerEvent::Status(_) => Topic::TableStatusUpdate,
            TimerEvent::Batch(_) => Topic::BatchTimerUpdate,
        }
    }

    /// JSON body of the notification, without the topic
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            TimerEvent::Timer(payload) => serde_json::to_string(payload),
            TimerEvent::Table(payload) => serde_json::to_string(payload),
            TimerEvent::Status(payload) => serde_json::to_string(payload),
            TimerEvent::Batch(payload) => serde_json::to_string(payload),
        }
    }

    /// Table ids this notification concerns
    pub fn table_ids(&self) -> Vec<TableId> {
        match self {
            TimerEvent::Timer(update) => vec![update.table_id],
            TimerEvent::Table(update) => vec![update.table_id],
            TimerEvent::Status(update) => vec![update.table_id],
            TimerEvent::Batch(batch) => batch.updates.iter().map(|u| u.table_id).collect(),
        }
    }
}
