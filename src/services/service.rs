//! # Service abstraction.
//!
//! A [`Service`] is one independently constructed subsystem behind a narrow
//! interface. The runtime never looks inside a service; it only needs the
//! small capability set here, and every method except `name` has a
//! reasonable default so concrete modules implement only what they use.
//!
//! Background services override [`Service::run`] with their own loop and
//! should periodically check the [`CancellationToken`] to stop cooperatively
//! during shutdown. Passive services keep the default `run`, which returns
//! immediately.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;

/// Shared handle to a service instance.
pub type ServiceRef = Arc<dyn Service>;

/// # An independently constructed, cooperatively cancelable subsystem.
///
/// ## Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use bootvisor::{Service, ServiceError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Service for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
///         while !ctx.is_cancelled() {
///             // do periodic work...
///             tokio::time::sleep(std::time::Duration::from_millis(100)).await;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns a stable, human-readable service name.
    fn name(&self) -> &str;

    /// The service's own run loop.
    ///
    /// Background services loop here until `ctx` is cancelled and must exit
    /// promptly afterwards; the runtime never forcibly terminates this
    /// future. The default implementation returns immediately, which is
    /// what passive services want.
    async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
        let _ = ctx;
        Ok(())
    }

    /// Extra teardown beyond cancellation (flush buffers, release devices).
    ///
    /// Called by `stop_all` after the run-loop token is cancelled. The
    /// default does nothing; services without teardown needs are tolerated.
    async fn stop(&self) {}

    /// Structured sub-report for status snapshots.
    ///
    /// The default reports `"not available"`, matching subsystems that do
    /// not implement introspection.
    fn status(&self) -> Value {
        Value::String("not available".to_string())
    }
}
