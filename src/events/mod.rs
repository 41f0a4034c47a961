//! In-process publish/subscribe signaling between services.
//!
//! - [`event`]: topic-keyed event record with payload, source, and sequence;
//! - [`bus`]: the bus itself — start/stop, subscription handles, isolated
//!   synchronous delivery.

mod bus;
mod event;

pub use bus::{EventBus, SubscriptionId};
pub use event::Event;

pub(crate) use bus::panic_message;
