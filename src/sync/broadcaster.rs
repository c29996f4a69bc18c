//! Fire-and-forget publish/subscribe for timer notifications

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, Weak,
    },
};

use tokio::sync::broadcast;
use tracing::trace;

use super::events::{
    BatchTimerUpdate, TableStatusUpdate, TableUpdate, TimerEvent, TimerUpdate, Topic,
};
use crate::{
    state::{Table, TableId},
    timer::Clock,
};

/// Capacity of the channel feeding streaming receivers
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

pub type Handler = Arc<dyn Fn(&TimerEvent) + Send + Sync>;
type HandlerMap = HashMap<Topic, Vec<(u64, Handler)>>;

/// Anything timer notifications can be published to and subscribed from
pub trait Publisher: Send + Sync {
    fn publish(&self, event: TimerEvent);

    /// Register `handler` for `topic` until the returned guard is dropped
    fn subscribe_handler(&self, topic: Topic, handler: Handler) -> Subscription;
}

/// In-process hub: synchronous topic handlers plus a broadcast channel for
/// streaming consumers such as the SSE endpoint
pub struct EventHub {
    sender: broadcast::Sender<TimerEvent>,
    handlers: Arc<Mutex<HandlerMap>>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            sender,
            handlers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    #[must_use = "dropping the subscription unsubscribes the handler"]
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&TimerEvent) + Send + Sync + 'static,
    {
        self.subscribe_handler(topic, Arc::new(handler))
    }

    /// Receiver for every notification published after this call
    pub fn receiver(&self) -> broadcast::Receiver<TimerEvent> {
        self.sender.subscribe()
    }

    pub fn handler_count(&self, topic: Topic) -> usize {
        self.handlers
            .lock()
            .map(|handlers| handlers.get(&topic).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Publisher for EventHub {
    fn publish(&self, event: TimerEvent) {
        let topic = event.topic();
        // snapshot so handlers can subscribe or publish without deadlocking
        let handlers: Vec<Handler> = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&topic)
            .map(|entries| entries.iter().map(|(_, handler)| Arc::clone(handler)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            (**handler)(&event);
        }

        if self.sender.send(event).is_err() && handlers.is_empty() {
            trace!("No listeners for {}", topic);
        }
    }

    fn subscribe_handler(&self, topic: Topic, handler: Handler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(topic)
            .or_default()
            .push((id, handler));

        let handlers: Weak<Mutex<HandlerMap>> = Arc::downgrade(&self.handlers);
        Subscription::new(topic, move || {
            let Some(handlers) = handlers.upgrade() else {
                return;
            };
            let mut handlers = handlers.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(entries) = handlers.get_mut(&topic) {
                entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }
}

type Cancel = Box<dyn FnOnce() + Send + Sync>;

/// Guard returned by [`Publisher::subscribe_handler`], runs its cancel hook once on drop
#[must_use = "dropping the subscription unsubscribes the handler"]
pub struct Subscription {
    topic: Topic,
    cancel: Option<Cancel>,
}

impl Subscription {
    pub fn new<F>(topic: Topic, cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            topic,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Typed emit operations on top of a [`Publisher`]
#[derive(Clone)]
pub struct Broadcaster {
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
}

impl Broadcaster {
    pub fn new(publisher: Arc<dyn Publisher>, clock: Arc<dyn Clock>) -> Self {
        Self { publisher, clock }
    }

    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&TimerEvent) + Send + Sync + 'static,
    {
        self.publisher.subscribe_handler(topic, Arc::new(handler))
    }

    pub fn broadcast_timer_update(&self, table_id: TableId, remaining_time_ms: f64, initial_time_ms: f64) {
        self.publisher.publish(TimerEvent::Timer(TimerUpdate {
            table_id,
            remaining_time_ms,
            initial_time_ms,
        }));
    }

    pub fn broadcast_table_update(&self, table_id: TableId, table: &Table) {
        self.publisher.publish(TimerEvent::Table(TableUpdate {
            table_id,
            table: table.clone(),
        }));
    }

    pub fn force_table_status_update(
        &self,
        table_id: TableId,
        remaining_time_ms: f64,
        initial_time_ms: f64,
        is_active: bool,
    ) {
        self.publisher.publish(TimerEvent::Status(TableStatusUpdate {
            table_id,
            remaining_time_ms,
            initial_time_ms,
            is_active,
            timestamp: self.clock.now(),
        }));
    }

    pub fn broadcast_batch(&self, updates: Vec<TimerUpdate>) {
        self.publisher.publish(TimerEvent::Batch(BatchTimerUpdate {
            updates,
            timestamp: self.clock.now(),
        }));
    }
}
