//! Runtime core: boot, loading, lifecycle, and supervision.
//!
//! Internal modules:
//! - [`context`]: the shared handle bundle passed to steps/stages/propagations;
//! - [`boot`]: the boot sequencer (strict order, catch-log-continue, report);
//! - [`loader`]: the staged resource loader (settle-paced, sequential);
//! - [`lifecycle`]: background service start/stop/join with per-service budgets;
//! - [`shutdown`]: cross-platform termination signal handling;
//! - [`orchestrator`]: the owner of all of the above plus the supervisory loop.

mod boot;
mod context;
mod lifecycle;
mod loader;
mod orchestrator;
pub(crate) mod shutdown;

pub use boot::{BootEntry, BootReport, BootSequencer, StepOutcome};
pub use context::BootContext;
pub use lifecycle::Lifecycle;
pub use loader::{LoadReport, SecondaryEntry, SecondaryOutcome, StageEntry, StageOutcome, StagedLoader};
pub use orchestrator::{BootSummary, Orchestrator, RunState};
