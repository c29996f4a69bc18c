//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod table_ticker;

// Re-export main functions
pub use table_ticker::{run_tick, table_ticker_task};
