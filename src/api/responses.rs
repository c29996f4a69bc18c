//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    state::{Table, TickerState},
    timer::{format_short_time, format_time},
};

/// Body of POST /tables/:id/start
#[derive(Debug, Clone, Deserialize)]
pub struct StartRequest {
    pub duration_minutes: f64,
}

/// Body of POST /tables/:id/add-time, negative minutes subtract
#[derive(Debug, Clone, Deserialize)]
pub struct AddTimeRequest {
    pub minutes: f64,
}

/// Table snapshot together with its derived remaining time
#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    #[serde(flatten)]
    pub table: Table,
    pub remaining_time_ms: f64,
    pub remaining: String,
    pub remaining_short: String,
    pub is_overtime: bool,
}

impl TableView {
    pub fn new(table: Table, remaining_seconds: f64) -> Self {
        let remaining_time_ms = remaining_seconds * 1000.0;
        Self {
            table,
            remaining_time_ms,
            remaining: format_time(remaining_time_ms),
            remaining_short: format_short_time(remaining_time_ms),
            is_overtime: remaining_time_ms < 0.0,
        }
    }
}

/// API response structure for table action endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub table: TableView,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(message: String, table: TableView) -> Self {
        let status = if table.table.is_active { "active" } else { "idle" };
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            table,
        }
    }
}

/// Service status with the latest ticker summary
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub ticker: TickerState,
    pub table_count: usize,
    pub update_mode: String,
    pub tick_interval_ms: u128,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
