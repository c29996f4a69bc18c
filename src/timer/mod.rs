//! Table session time derivation
//!
//! Everything here is synchronous and never blocks: the calculator is called on
//! every tick for every active table.

pub mod calculator;
pub mod clock;
pub mod format;
pub mod session;

pub use calculator::{
    calculate_remaining_time_on_the_fly, remaining_ms_at, TimerCalculator, DEFAULT_CACHE_WINDOW,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use format::{format_short_time, format_time};
pub use session::{RawSessionTiming, SessionTiming};
