//! Configuration and CLI argument handling

use std::time::Duration;

use clap::Parser;

use crate::sync::SyncSettings;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "cue-clock")]
#[command(about = "Table session timers with throttled update broadcasting")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Number of tables to create at startup
    #[arg(long, default_value = "8")]
    pub tables: u32,

    /// Ticker interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub tick_ms: u64,

    /// Throttle window for per-table updates in milliseconds
    #[arg(long, default_value = "100")]
    pub throttle_ms: u64,

    /// How long a computed remaining time is reused, in milliseconds
    #[arg(long, default_value = "100")]
    pub cache_window_ms: u64,

    /// Broadcast each table through the throttle instead of one batch per tick
    #[arg(long)]
    pub per_table: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            throttle_interval: Duration::from_millis(self.throttle_ms),
            cache_window: Duration::from_millis(self.cache_window_ms),
            ..SyncSettings::default()
        }
    }
}
