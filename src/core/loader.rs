//! # Staged resource loader: sequential, settle-paced acquisition.
//!
//! Loads the catalogue's stages strictly one at a time, inserting the
//! configured settle delay after **every** attempt (success or failure) so
//! resource usage stabilizes before the next heavyweight load begins. The
//! trade is deliberate: longer total boot latency for a bounded peak
//! resource ceiling.
//!
//! ## Per-stage state machine
//! ```text
//! Pending ──► Loading ──► Loaded
//!                     └─► Failed      (no automatic retry; the resource is
//!                                      unavailable until a human intervenes)
//! ```
//!
//! After the ordered list completes, optional secondary subsystems that
//! depend on the loaded resources run under the same catch-log-continue
//! policy, with a tagged outcome (Ready | Skipped | Failed) instead of a
//! silent swallow.

use std::fmt;
use std::time::Duration;

use futures::FutureExt;
use tracing::{info, warn};

use crate::catalog::{SecondaryRef, StageRef};
use crate::error::LoadError;
use crate::events::panic_message;

use super::context::BootContext;

/// Final state of one load stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    /// The resource loaded.
    Loaded,
    /// The load failed; dependents degrade gracefully.
    Failed(String),
}

impl StageOutcome {
    /// True for [`StageOutcome::Loaded`].
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, StageOutcome::Loaded)
    }
}

/// Outcome of one secondary subsystem initialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecondaryOutcome {
    /// The subsystem initialized.
    Ready,
    /// A prerequisite was unavailable; the subsystem declined.
    Skipped(String),
    /// Initialization failed or panicked.
    Failed(String),
}

/// One line of the load report.
#[derive(Clone, Debug)]
pub struct StageEntry {
    /// Position in the declared stage order.
    pub order: usize,
    /// The stage's layer key.
    pub key: String,
    /// The stage's human-readable descriptor.
    pub descriptor: String,
    /// What happened.
    pub outcome: StageOutcome,
}

/// One secondary-subsystem line of the load report.
#[derive(Clone, Debug)]
pub struct SecondaryEntry {
    /// The subsystem's name.
    pub name: String,
    /// What happened.
    pub outcome: SecondaryOutcome,
}

/// Structured summary of a completed load phase.
#[derive(Clone, Debug, Default)]
pub struct LoadReport {
    /// Per-stage outcomes, in execution order.
    pub stages: Vec<StageEntry>,
    /// Per-subsystem outcomes, in execution order.
    pub secondary: Vec<SecondaryEntry>,
}

impl LoadReport {
    /// Number of stages that loaded.
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.stages.iter().filter(|e| e.outcome.is_loaded()).count()
    }

    /// Outcome of the stage with the given key, if it ran.
    #[must_use]
    pub fn outcome(&self, key: &str) -> Option<&StageOutcome> {
        self.stages.iter().find(|e| e.key == key).map(|e| &e.outcome)
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "load report: {}/{} stages loaded",
            self.loaded(),
            self.stages.len()
        )?;
        for entry in &self.stages {
            match &entry.outcome {
                StageOutcome::Loaded => writeln!(
                    f,
                    "  [{}] {} ({}) .. loaded",
                    entry.order, entry.key, entry.descriptor
                )?,
                StageOutcome::Failed(error) => writeln!(
                    f,
                    "  [{}] {} ({}) .. FAILED: {}",
                    entry.order, entry.key, entry.descriptor, error
                )?,
            }
        }
        for entry in &self.secondary {
            match &entry.outcome {
                SecondaryOutcome::Ready => writeln!(f, "  [secondary] {} .. ready", entry.name)?,
                SecondaryOutcome::Skipped(reason) => {
                    writeln!(f, "  [secondary] {} .. skipped: {}", entry.name, reason)?
                }
                SecondaryOutcome::Failed(error) => {
                    writeln!(f, "  [secondary] {} .. FAILED: {}", entry.name, error)?
                }
            }
        }
        Ok(())
    }
}

/// Executes load stages sequentially with a settle delay between attempts.
pub struct StagedLoader {
    settle: Duration,
}

impl StagedLoader {
    /// Creates a loader with the given settle delay.
    #[must_use]
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }

    /// Runs every stage in declared order, then the secondary initializers.
    ///
    /// A stage failure is logged and recorded; remaining stages still run.
    /// The settle delay follows every attempt, including failed ones — the
    /// point is to let allocation pressure subside, and a failed load can
    /// leave just as much debris as a successful one.
    pub async fn load_all(
        &self,
        ctx: &BootContext,
        stages: &[StageRef],
        secondary: &[SecondaryRef],
    ) -> LoadReport {
        let mut report = LoadReport::default();

        for (order, stage) in stages.iter().enumerate() {
            let key = stage.key().to_string();
            let descriptor = stage.descriptor().to_string();
            info!(
                stage = %key,
                descriptor = %descriptor,
                order,
                total = stages.len(),
                "loading resource"
            );

            let outcome = match std::panic::AssertUnwindSafe(stage.load(ctx))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {
                    info!(stage = %key, "resource loaded");
                    StageOutcome::Loaded
                }
                Ok(Err(e)) => {
                    warn!(stage = %key, error = %e, "load failed; stage skipped");
                    StageOutcome::Failed(e.to_string())
                }
                Err(panic) => {
                    let msg = panic_message(&*panic);
                    warn!(stage = %key, panic = %msg, "load panicked; stage skipped");
                    StageOutcome::Failed(format!("panicked: {msg}"))
                }
            };

            report.stages.push(StageEntry {
                order,
                key,
                descriptor,
                outcome,
            });

            // Settle after every attempt so the next load starts from a
            // stable resource baseline.
            tokio::time::sleep(self.settle).await;
        }

        for init in secondary {
            report.secondary.push(self.init_secondary(ctx, init).await);
        }
        report
    }

    async fn init_secondary(&self, ctx: &BootContext, init: &SecondaryRef) -> SecondaryEntry {
        let name = init.name().to_string();
        let outcome = match std::panic::AssertUnwindSafe(init.init(ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {
                info!(subsystem = %name, "secondary subsystem ready");
                SecondaryOutcome::Ready
            }
            Ok(Err(LoadError::Skipped { reason })) => {
                info!(subsystem = %name, reason = %reason, "secondary subsystem skipped");
                SecondaryOutcome::Skipped(reason)
            }
            Ok(Err(e)) => {
                warn!(subsystem = %name, error = %e, "secondary subsystem failed");
                SecondaryOutcome::Failed(e.to_string())
            }
            Err(panic) => {
                let msg = panic_message(&*panic);
                warn!(subsystem = %name, panic = %msg, "secondary subsystem panicked");
                SecondaryOutcome::Failed(format!("panicked: {msg}"))
            }
        };
        SecondaryEntry { name, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SecondaryInitFn, StageFn};
    use crate::config::Config;
    use crate::core::Lifecycle;
    use crate::events::EventBus;
    use crate::registry::ServiceRegistry;
    use crate::wiring::WiringTable;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn test_ctx() -> BootContext {
        BootContext {
            config: Config::default(),
            registry: Arc::new(ServiceRegistry::new()),
            lifecycle: Arc::new(Lifecycle::new()),
            bus: Arc::new(EventBus::new()),
            wiring: Arc::new(WiringTable::new()),
        }
    }

    fn recording_stage(
        key: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> StageRef {
        StageFn::arc(key, key, move |_ctx| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(key);
                if fail {
                    Err(LoadError::failed("out of memory"))
                } else {
                    Ok(())
                }
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn failing_stage_does_not_stop_later_stages() {
        let ctx = test_ctx();
        let log = Arc::new(Mutex::new(Vec::new()));
        let stages = vec![
            recording_stage("reflex", log.clone(), false),
            recording_stage("social", log.clone(), true),
            recording_stage("cortical", log.clone(), false),
        ];

        let loader = StagedLoader::new(Duration::from_secs(1));
        let report = loader.load_all(&ctx, &stages, &[]).await;

        assert_eq!(*log.lock().unwrap(), ["reflex", "social", "cortical"]);
        assert_eq!(report.loaded(), 2);
        assert!(matches!(
            report.outcome("social"),
            Some(StageOutcome::Failed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_follows_every_attempt() {
        let ctx = test_ctx();
        let stages = vec![
            recording_stage("a", Arc::new(Mutex::new(Vec::new())), false),
            recording_stage("b", Arc::new(Mutex::new(Vec::new())), true),
            recording_stage("c", Arc::new(Mutex::new(Vec::new())), false),
        ];

        let settle = Duration::from_secs(1);
        let started = Instant::now();
        StagedLoader::new(settle)
            .load_all(&ctx, &stages, &[])
            .await;

        // Three attempts, three settles — the failed stage settles too.
        assert!(started.elapsed() >= settle * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stages_never_overlap() {
        let ctx = test_ctx();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let mut stages = Vec::new();
        for key in ["a", "b", "c"] {
            let in_flight = in_flight.clone();
            let overlaps = overlaps.clone();
            stages.push(StageFn::arc(key, key, move |_ctx| {
                let in_flight = in_flight.clone();
                let overlaps = overlaps.clone();
                async move {
                    if in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            }) as StageRef);
        }

        StagedLoader::new(Duration::from_millis(10))
            .load_all(&ctx, &stages, &[])
            .await;
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn secondary_outcomes_are_tagged() {
        let ctx = test_ctx();
        let secondary: Vec<SecondaryRef> = vec![
            SecondaryInitFn::arc("kv-cache", |_ctx| async { Ok(()) }),
            SecondaryInitFn::arc("hierarchical-brain", |_ctx| async {
                Err(LoadError::skipped("cortical model unavailable"))
            }),
            SecondaryInitFn::arc("planner", |_ctx| async {
                Err(LoadError::failed("init crashed"))
            }),
        ];

        let report = StagedLoader::new(Duration::from_millis(1))
            .load_all(&ctx, &[], &secondary)
            .await;

        assert_eq!(report.secondary[0].outcome, SecondaryOutcome::Ready);
        assert_eq!(
            report.secondary[1].outcome,
            SecondaryOutcome::Skipped("cortical model unavailable".to_string())
        );
        assert!(matches!(
            report.secondary[2].outcome,
            SecondaryOutcome::Failed(_)
        ));
    }
}
