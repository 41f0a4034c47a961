//! Structured runtime status for external tooling.
//!
//! [`StatusReport`] is the serializable snapshot a status CLI or health
//! endpoint renders. It is assembled on demand from the registry and the
//! lifecycle manager; nothing here is cached.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::core::RunState;

/// One subsystem's self-reported status.
///
/// Services that do not implement introspection report the string
/// `"not available"`.
#[derive(Clone, Debug, Serialize)]
pub struct SubsystemStatus {
    /// Registered service name.
    pub name: String,
    /// The service's own status payload.
    pub status: Value,
}

/// Point-in-time snapshot of the whole runtime.
#[derive(Clone, Debug, Serialize)]
pub struct StatusReport {
    /// True once boot has completed (successfully or degraded).
    pub initialized: bool,
    /// Current run state.
    pub run_state: RunState,
    /// Background services whose run loops are still alive.
    pub running_services: usize,
    /// Per-subsystem status, in registration order.
    pub subsystems: Vec<SubsystemStatus>,
}

impl StatusReport {
    /// Serializes the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "runtime: {:?} (initialized: {}, running services: {})",
            self.run_state, self.initialized, self.running_services
        )?;
        for subsystem in &self.subsystems {
            writeln!(f, "  {}: {}", subsystem.name, subsystem.status)?;
        }
        Ok(())
    }
}
