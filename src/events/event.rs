//! # Events carried by the bus.
//!
//! An [`Event`] is a topic-keyed record published by one service and
//! delivered to every current subscriber of that topic. The payload shape is
//! owned by the publishing service, not by the runtime — it is an arbitrary
//! [`serde_json::Value`].
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically across all topics. Use `seq` to reconstruct publish order
//! when consumers record events out of band.
//!
//! ## Example
//! ```rust
//! use bootvisor::Event;
//! use serde_json::json;
//!
//! let ev = Event::new("speech.text", json!({"text": "hello"}), "consciousness");
//! assert_eq!(ev.topic.as_ref(), "speech.text");
//! assert_eq!(ev.source.as_ref(), "consciousness");
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use serde_json::Value;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A published event with topic, payload, and provenance.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `topic`/`source`: cheap `Arc<str>` handles, cloned per delivery
/// - `payload`: structured record whose fields belong to the publisher
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp at publish time.
    pub at: SystemTime,
    /// Topic this event was published on.
    pub topic: Arc<str>,
    /// Name of the publishing service.
    pub source: Arc<str>,
    /// Topic-specific structured payload.
    pub payload: Value,
}

impl Event {
    /// Creates an event with the current timestamp and next sequence number.
    pub fn new(
        topic: impl Into<Arc<str>>,
        payload: Value,
        source: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            topic: topic.into(),
            source: source.into(),
            payload,
        }
    }
}
