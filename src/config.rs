//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for the orchestrator.
//!
//! Config is consumed in three places:
//! 1. **Staged loading**: `settle` is the pause inserted after every load
//!    attempt, trading boot latency for a bounded peak-resource ceiling.
//! 2. **Supervisory loop**: `tick` is the fixed period between propagation
//!    passes.
//! 3. **Shutdown**: `join_timeout` is the per-service (not cumulative) wait
//!    budget during `join_all`.

use std::time::Duration;

/// Global configuration for the orchestrator runtime.
///
/// ## Field semantics
/// - `settle`: pause after each load-stage attempt (success **or** failure)
///   so memory/device allocation stabilizes before the next load
/// - `tick`: fixed period of the supervisory loop; a tick never overlaps
///   the next one
/// - `join_timeout`: how long `join_all` waits for **each** background
///   service to exit its run loop; a service still running afterwards is
///   abandoned, not killed
///
/// There is deliberately no timeout on boot steps or load stages: a hanging
/// constructor blocks boot. That matches the system this runtime supervises
/// and keeps failure attribution unambiguous.
#[derive(Clone, Debug)]
pub struct Config {
    /// Settle delay inserted after every load-stage attempt.
    pub settle: Duration,

    /// Period of the supervisory loop.
    pub tick: Duration,

    /// Per-service join budget during shutdown.
    pub join_timeout: Duration,
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `settle = 1s` (enough for allocator/device pressure to stabilize
    ///   between heavyweight loads)
    /// - `tick = 5s` (state propagation cadence)
    /// - `join_timeout = 2s` (per service, during shutdown)
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            tick: Duration::from_secs(5),
            join_timeout: Duration::from_secs(2),
        }
    }
}
