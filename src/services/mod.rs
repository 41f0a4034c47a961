//! Service abstraction consumed by the runtime.
//!
//! - [`service`]: the [`Service`] trait (async, cancelable) and shared
//!   [`ServiceRef`] handle;
//! - [`service_fn`]: function-backed implementation for closures and tests.

mod service;
mod service_fn;

pub use service::{Service, ServiceRef};
pub use service_fn::ServiceFn;
