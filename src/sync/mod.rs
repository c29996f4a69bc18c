//! Timer update broadcasting
//!
//! This module contains the publish/subscribe hub, the throttle/batch
//! coordinator and the context object that owns them.

pub mod broadcaster;
pub mod context;
pub mod coordinator;
pub mod events;

// Re-export main types
pub use broadcaster::{Broadcaster, EventHub, Handler, Publisher, Subscription};
pub use context::{SyncSettings, TimerSyncContext};
pub use coordinator::{PendingUpdate, ThrottleCoordinator};
pub use events::{TimerEvent, TimerUpdate, Topic};
