//! Cue Clock - table session timers for a billiards hall dashboard
//!
//! This library derives each table's remaining time from its persisted session
//! timing and fans timer changes out to decoupled subscribers, coalescing
//! per-second ticks so many active tables do not flood the dashboard.

pub mod api;
pub mod config;
pub mod error;
pub mod state;
pub mod sync;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use state::AppState;
pub use sync::TimerSyncContext;
pub use utils::signals::shutdown_signal;
