//! # Lifecycle manager for background services.
//!
//! Tracks every Background-kind service started during boot and gives the
//! orchestrator uniform start/stop/join semantics over heterogeneous
//! modules.
//!
//! ## Architecture
//! ```text
//! start(handle)
//!   └─► child CancellationToken
//!       tokio::spawn(service.run(token))      ──► Managed { handle, cancel, join }
//!
//! stop_all()
//!   └─► per service: cancel token, then service.stop()
//!
//! join_all(timeout)
//!   └─► per service: wait up to `timeout` on its JoinHandle
//!         ├─ joined   → service finished its loop
//!         └─ timeout  → log shutdown_timeout, ABANDON (never abort)
//! ```
//!
//! ## Rules
//! - The join budget is **per service**, not cumulative: every service
//!   independently gets the full timeout.
//! - An abandoned service is left running; the runtime never forcibly
//!   terminates an execution context. Cancellation is cooperative.
//! - Stop ordering is registration order and carries no dependency
//!   guarantee; callers with teardown dependencies must stop those
//!   services explicitly, in hand-coded order, before `stop_all`.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::registry::ServiceHandle;

struct Managed {
    handle: ServiceHandle,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Uniform start/stop/join over background services.
#[derive(Default)]
pub struct Lifecycle {
    services: Mutex<Vec<Managed>>,
}

impl Lifecycle {
    /// Creates an empty lifecycle manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the service's run loop and starts tracking it.
    ///
    /// The loop gets its own cancellation token; a run-loop error is logged
    /// and does not propagate (one service's death never aborts the
    /// process).
    pub async fn start(&self, handle: ServiceHandle) {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let instance = handle.instance.clone();
        let name = handle.name.clone();

        let join = tokio::spawn(async move {
            match instance.run(token).await {
                Ok(()) => debug!(service = %name, "run loop exited"),
                // Cancellation-driven exit is graceful, not a failure.
                Err(ServiceError::Canceled) => {
                    debug!(service = %name, "run loop cancelled")
                }
                Err(e) => warn!(service = %name, error = %e, "run loop failed"),
            }
        });

        let mut services = self.services.lock().await;
        services.push(Managed {
            handle,
            cancel,
            join,
        });
    }

    /// True if the named service's run loop is still executing.
    pub async fn is_alive(&self, name: &str) -> bool {
        let services = self.services.lock().await;
        services
            .iter()
            .find(|m| m.handle.name.as_ref() == name)
            .is_some_and(|m| !m.join.is_finished())
    }

    /// Number of tracked services whose run loops are still executing.
    pub async fn running_count(&self) -> usize {
        let services = self.services.lock().await;
        services.iter().filter(|m| !m.join.is_finished()).count()
    }

    /// Requests every tracked service to stop: cancels its run-loop token,
    /// then invokes its `stop()` teardown.
    ///
    /// Services without teardown are tolerated (`stop` defaults to a
    /// no-op). Ordering is registration order with no dependency guarantee.
    pub async fn stop_all(&self) {
        let services = self.services.lock().await;
        for managed in services.iter() {
            managed.cancel.cancel();
            managed.handle.instance.stop().await;
        }
    }

    /// Waits for each service to finish its run loop, up to `timeout`
    /// **per service**. Returns the names of services that did not stop in
    /// time and were abandoned.
    pub async fn join_all(&self, timeout: Duration) -> Vec<String> {
        let mut services = self.services.lock().await;
        let mut abandoned = Vec::new();

        for managed in services.iter_mut() {
            if managed.join.is_finished() {
                continue;
            }
            match tokio::time::timeout(timeout, &mut managed.join).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!(service = %managed.handle.name, error = %join_err, "run loop panicked");
                }
                Err(_elapsed) => {
                    warn!(
                        service = %managed.handle.name,
                        timeout = ?timeout,
                        "shutdown_timeout: service did not stop in time; abandoning"
                    );
                    abandoned.push(managed.handle.name.to_string());
                }
            }
        }
        abandoned
    }
}
