//! # Boot sequencer: ordered, failure-isolated initialization.
//!
//! Executes the catalogue's steps strictly in declared order on the
//! orchestrator's own context (no two steps ever run concurrently). Every
//! failure — a returned [`StepError`] or a panic — is caught at this
//! boundary, logged with the step label, and recorded; boot never aborts
//! because one step failed. The system comes up with whatever subset of
//! services initialized successfully.
//!
//! ```text
//! run(steps):
//!   for each step, in order:
//!     ├─ Ok(())      → Succeeded
//!     ├─ Err(e)      → Failed(e), log, continue
//!     └─ panic       → Failed(panic message), log, continue
//!   wiring.connect()   (second phase: edges deferred by earlier steps)
//!   → BootReport
//! ```
//!
//! There is deliberately no per-step timeout: a hanging constructor blocks
//! boot. The supervised system accepts that risk in exchange for
//! unambiguous failure attribution.

use std::fmt;

use futures::FutureExt;
use tracing::{info, warn};

use crate::catalog::StepRef;
use crate::events::panic_message;

use super::context::BootContext;

/// Outcome of one boot step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step completed.
    Succeeded,
    /// The step returned an error or panicked; boot continued without it.
    Failed(String),
}

impl StepOutcome {
    /// True for [`StepOutcome::Succeeded`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }
}

/// One line of the boot report.
#[derive(Clone, Debug)]
pub struct BootEntry {
    /// Position in the declared step order.
    pub index: usize,
    /// The step's label.
    pub label: String,
    /// What happened.
    pub outcome: StepOutcome,
}

/// Structured summary of a completed boot pass.
#[derive(Clone, Debug, Default)]
pub struct BootReport {
    /// Per-step outcomes, in execution order.
    pub entries: Vec<BootEntry>,
}

impl BootReport {
    /// Number of steps that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    /// Number of steps that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    /// Outcome of the step with the given label, if it ran.
    #[must_use]
    pub fn outcome(&self, label: &str) -> Option<&StepOutcome> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| &e.outcome)
    }
}

impl fmt::Display for BootReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "boot report: {} succeeded, {} failed",
            self.succeeded(),
            self.failed()
        )?;
        for entry in &self.entries {
            match &entry.outcome {
                StepOutcome::Succeeded => {
                    writeln!(f, "  [{}] {} .. ok", entry.index, entry.label)?;
                }
                StepOutcome::Failed(error) => {
                    writeln!(f, "  [{}] {} .. FAILED: {}", entry.index, entry.label, error)?;
                }
            }
        }
        Ok(())
    }
}

/// Executes an ordered catalogue of boot steps with per-step isolation.
pub struct BootSequencer;

impl BootSequencer {
    /// Runs `steps` strictly in order, then applies the wiring second
    /// phase, and returns the structured report.
    pub async fn run(ctx: &BootContext, steps: &[StepRef]) -> BootReport {
        let mut report = BootReport::default();

        for (index, step) in steps.iter().enumerate() {
            let label = step.label().to_string();
            info!(step = %label, index, total = steps.len(), "boot step starting");

            let outcome = match std::panic::AssertUnwindSafe(step.execute(ctx))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => StepOutcome::Succeeded,
                Ok(Err(e)) => {
                    warn!(step = %label, error = %e, "boot step failed; continuing");
                    StepOutcome::Failed(e.to_string())
                }
                Err(panic) => {
                    let msg = panic_message(&*panic);
                    warn!(step = %label, panic = %msg, "boot step panicked; continuing");
                    StepOutcome::Failed(format!("panicked: {msg}"))
                }
            };

            report.entries.push(BootEntry {
                index,
                label,
                outcome,
            });
        }

        // Second connect phase: edges declared before their endpoints
        // existed are applied now that every step has run.
        let applied = ctx.wiring.connect(&ctx.registry);
        info!(
            applied,
            pending = ctx.wiring.pending().len(),
            "boot wiring pass complete"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StepFn;
    use crate::config::Config;
    use crate::core::Lifecycle;
    use crate::error::StepError;
    use crate::events::EventBus;
    use crate::registry::{ServiceKind, ServiceRegistry};
    use crate::services::ServiceFn;
    use crate::wiring::{WireSpec, WiringTable};
    use std::sync::Arc;

    fn test_ctx() -> BootContext {
        BootContext {
            config: Config::default(),
            registry: Arc::new(ServiceRegistry::new()),
            lifecycle: Arc::new(Lifecycle::new()),
            bus: Arc::new(EventBus::new()),
            wiring: Arc::new(WiringTable::new()),
        }
    }

    fn register_step(label: &'static str) -> crate::catalog::StepRef {
        StepFn::arc(label, move |ctx: BootContext| async move {
            let svc = ServiceFn::arc(label, |_c| async { Ok(()) });
            ctx.registry.register(label, svc, ServiceKind::Passive)?;
            Ok(())
        })
    }

    #[tokio::test]
    async fn failing_step_does_not_stop_later_steps() {
        let ctx = test_ctx();
        let steps: Vec<crate::catalog::StepRef> = vec![
            register_step("dna"),
            StepFn::arc("hypothalamus", |_ctx| async {
                Err(StepError::failed("sensor offline"))
            }),
            register_step("hippocampus"),
        ];

        let report = BootSequencer::run(&ctx, &steps).await;

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.outcome("hypothalamus"),
            Some(&StepOutcome::Failed("step failed: sensor offline".to_string()))
        );
        // Registry holds services from the surviving steps only.
        assert!(ctx.registry.contains("dna"));
        assert!(!ctx.registry.contains("hypothalamus"));
        assert!(ctx.registry.contains("hippocampus"));
    }

    #[tokio::test]
    async fn panicking_step_is_contained() {
        let ctx = test_ctx();
        let steps: Vec<crate::catalog::StepRef> = vec![
            StepFn::arc("explodes", |_ctx| async { panic!("kaboom") }),
            register_step("after"),
        ];

        let report = BootSequencer::run(&ctx, &steps).await;
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcome("explodes"),
            Some(StepOutcome::Failed(msg)) if msg.contains("kaboom")
        ));
        assert!(ctx.registry.contains("after"));
    }

    #[tokio::test]
    async fn deferred_wiring_applies_after_late_step() {
        let ctx = test_ctx();
        let steps: Vec<crate::catalog::StepRef> = vec![
            // Declares an edge into a service registered a step later.
            StepFn::arc("consciousness", |ctx: BootContext| async move {
                ctx.wiring.wire(WireSpec::new(
                    "consciousness->occipital",
                    ["occipital"],
                    |reg| {
                        reg.get("occipital").map_err(|e| {
                            crate::error::WiringError::Failed {
                                edge: "consciousness->occipital".to_string(),
                                error: e.to_string(),
                            }
                        })?;
                        Ok(())
                    },
                ));
                Ok(())
            }),
            register_step("occipital"),
        ];

        let report = BootSequencer::run(&ctx, &steps).await;
        assert_eq!(report.failed(), 0);
        assert_eq!(ctx.wiring.applied_count(), 1);
        assert!(ctx.wiring.pending().is_empty());
    }
}
