//! State management module
//!
//! This module contains the table registry, ticker state and the application
//! state that ties them to the sync context.

pub mod app_state;
pub mod table;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use table::{Table, TableDetails, TableId, TableRegistry};
pub use timer_state::TickerState;
