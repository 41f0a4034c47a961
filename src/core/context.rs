//! # Shared runtime handles for catalogue code.
//!
//! [`BootContext`] is the bundle of references a boot step, load stage,
//! secondary initializer, or propagation works through. Everything inside
//! is an `Arc`, so cloning the context is cheap and catalogue closures can
//! move a clone into their futures.

use std::sync::Arc;

use crate::config::Config;
use crate::events::EventBus;
use crate::registry::ServiceRegistry;
use crate::wiring::WiringTable;

use super::lifecycle::Lifecycle;

/// Handles shared between the orchestrator and catalogue code.
///
/// Consumers receive services by explicit reference through
/// [`BootContext::registry`] rather than through ambient globals; the
/// context itself carries no service instances.
#[derive(Clone)]
pub struct BootContext {
    /// Runtime configuration (tick period, settle delay, join budget).
    pub config: Config,
    /// Name → singleton service handles.
    pub registry: Arc<ServiceRegistry>,
    /// Background-service lifecycle manager.
    pub lifecycle: Arc<Lifecycle>,
    /// Cross-service signaling bus.
    pub bus: Arc<EventBus>,
    /// Two-phase wiring table.
    pub wiring: Arc<WiringTable>,
}
