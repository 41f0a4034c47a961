//! # Event bus: topic-keyed, best-effort, at-most-once delivery.
//!
//! [`EventBus`] delivers each published [`Event`] to every handler currently
//! subscribed to its topic, synchronously on the publisher's execution
//! context. It is not a queue or a log: nothing is persisted, and a late
//! subscriber never sees past events.
//!
//! ## Architecture
//! ```text
//! publish(topic, payload, source)
//!     │  (no-op while the bus is stopped)
//!     ├─ snapshot handlers for `topic`   (read lock, then released)
//!     ├─ handler 1 ── panic caught, logged, delivery continues
//!     ├─ handler 2
//!     └─ handler N
//! ```
//!
//! ## Rules
//! - `publish` while stopped is a **no-op** and never fails.
//! - `subscribe` while stopped still records the subscription; it becomes
//!   live when the bus restarts.
//! - A panicking handler is isolated: the panic is caught and logged, and
//!   remaining handlers of the same event still run.
//! - Invocation order across subscribers of one topic is unspecified.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::warn;

use super::event::Event;

/// Handler invoked for each event on a subscribed topic.
///
/// Runs on the publisher's execution context; keep it cheap and non-blocking.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Opaque handle returned by [`EventBus::subscribe`], usable for cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    handler: Handler,
}

/// Topic-keyed publish/subscribe bus.
///
/// The subscriber table is mutated concurrently with publication (boot steps
/// subscribe while already-running services publish), so it lives behind an
/// `RwLock` and `publish` works on a snapshot taken under the read lock.
pub struct EventBus {
    running: AtomicBool,
    next_id: AtomicU64,
    topics: RwLock<HashMap<Arc<str>, Vec<Entry>>>,
}

impl EventBus {
    /// Creates a stopped bus. Call [`EventBus::start`] to enable delivery.
    #[must_use]
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Enables delivery.
    pub fn start(&self) {
        self.running.store(true, AtomicOrdering::SeqCst);
    }

    /// Disables delivery. Subscriptions are kept for a later restart.
    pub fn stop(&self) {
        self.running.store(false, AtomicOrdering::SeqCst);
    }

    /// True if the bus currently delivers events.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(AtomicOrdering::SeqCst)
    }

    /// Registers `handler` for `topic` and returns a cancellation handle.
    ///
    /// Works whether or not the bus is running; a subscription made while
    /// stopped becomes live on restart. Multiple subscriptions per topic are
    /// allowed.
    pub fn subscribe(
        &self,
        topic: impl Into<Arc<str>>,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        let mut topics = self.topics.write().unwrap();
        topics.entry(topic.into()).or_default().push(Entry {
            id,
            handler: Arc::new(handler),
        });
        id
    }

    /// Cancels a subscription. Unknown handles are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut topics = self.topics.write().unwrap();
        for entries in topics.values_mut() {
            entries.retain(|e| e.id != id);
        }
        topics.retain(|_, entries| !entries.is_empty());
    }

    /// Publishes an event to every current subscriber of `topic`.
    ///
    /// While the bus is stopped this is a no-op. A handler that panics does
    /// not prevent delivery to the remaining handlers; the panic is caught
    /// and logged.
    pub fn publish(&self, topic: impl Into<Arc<str>>, payload: Value, source: &str) {
        if !self.is_running() {
            return;
        }
        let topic = topic.into();

        // Snapshot under the read lock so handlers may subscribe/unsubscribe.
        let handlers: Vec<(SubscriptionId, Handler)> = {
            let topics = self.topics.read().unwrap();
            match topics.get(&topic) {
                Some(entries) => entries
                    .iter()
                    .map(|e| (e.id, Arc::clone(&e.handler)))
                    .collect(),
                None => return,
            }
        };

        let ev = Event::new(topic, payload, source);
        for (id, handler) in handlers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(&ev))) {
                warn!(
                    topic = %ev.topic,
                    subscription = id.0,
                    panic = ?panic_message(&panic),
                    "event handler panicked; continuing delivery"
                );
            }
        }
    }

    /// Number of subscriptions currently recorded for `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let topics = self.topics.read().unwrap();
        topics.get(topic).map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort extraction of a panic payload message.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
