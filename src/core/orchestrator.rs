//! # Orchestrator: boot sequencing, staged loading, supervision, shutdown.
//!
//! The [`Orchestrator`] owns the service registry, the lifecycle manager,
//! the event bus, and the wiring table. It is the single place where
//! ordering, partial-failure isolation, lifecycle correctness, and
//! resource-pressure pacing interact; every module behind it is a concrete
//! [`Service`](crate::Service) reached through a narrow interface.
//!
//! ## High-level flow
//! ```text
//! boot(catalog):
//!   catalog.validate()                 (only fatal gate)
//!   bus.start()
//!   BootSequencer::run(steps)          (ordered, catch-log-continue)
//!   StagedLoader::load_all(stages)     (sequential, settle-paced)
//!   state = Running
//!
//! run(propagations):
//!   loop {
//!     tick: each propagation, isolated
//!   } until interrupt or shutdown handle
//!
//! shutdown path (exactly once):
//!   state = ShuttingDown
//!   spawn second-interrupt watcher     (hard process exit on repeat)
//!   lifecycle.stop_all()
//!   lifecycle.join_all(join_timeout)   (per-service budget, abandon stragglers)
//!   bus.stop()
//!   state = Stopped
//! ```
//!
//! Boot steps, load stages, and the supervisory loop all run on the
//! orchestrator's own context, strictly sequentially; only background
//! service run loops execute in parallel.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering as AtomicOrdering};
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde_json::json;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::catalog::{BootCatalog, PropagationRef};
use crate::config::Config;
use crate::error::ConfigError;
use crate::events::{panic_message, EventBus};
use crate::registry::{ServiceKind, ServiceRegistry};
use crate::status::StatusReport;
use crate::wiring::WiringTable;

use super::boot::{BootReport, BootSequencer};
use super::context::BootContext;
use super::lifecycle::Lifecycle;
use super::loader::{LoadReport, StagedLoader};
use super::shutdown;

/// Process-wide run state.
///
/// Mutated only by the orchestrator; readable by anyone holding the
/// orchestrator (the status snapshot includes it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Boot sequence in progress.
    Booting,
    /// Boot complete; supervisory loop active.
    Running,
    /// Interrupt observed; stop/join in progress.
    ShuttingDown,
    /// Shutdown complete.
    Stopped,
}

struct RunStateCell(AtomicU8);

impl RunStateCell {
    fn new(state: RunState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn store(&self, state: RunState) {
        self.0.store(state as u8, AtomicOrdering::SeqCst);
    }

    fn load(&self) -> RunState {
        match self.0.load(AtomicOrdering::SeqCst) {
            0 => RunState::Booting,
            1 => RunState::Running,
            2 => RunState::ShuttingDown,
            _ => RunState::Stopped,
        }
    }

    /// Atomically claims the transition into `ShuttingDown`.
    ///
    /// Returns `false` if shutdown is already in progress or done, so
    /// concurrent callers race for exactly one winner.
    fn begin_shutdown(&self) -> bool {
        self.0
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |s| {
                if s == RunState::ShuttingDown as u8 || s == RunState::Stopped as u8 {
                    None
                } else {
                    Some(RunState::ShuttingDown as u8)
                }
            })
            .is_ok()
    }
}

/// Combined summary of the boot phase, returned by [`Orchestrator::boot`].
#[derive(Clone, Debug)]
pub struct BootSummary {
    /// Per-step outcomes.
    pub boot: BootReport,
    /// Per-stage and per-secondary outcomes.
    pub load: LoadReport,
}

/// Boots, supervises, and shuts down a set of independently developed,
/// stateful services.
pub struct Orchestrator {
    ctx: BootContext,
    state: RunStateCell,
    shutdown_token: CancellationToken,
}

impl Orchestrator {
    /// Creates an orchestrator with fresh registry, lifecycle, bus, and
    /// wiring components.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            ctx: BootContext {
                config,
                registry: Arc::new(ServiceRegistry::new()),
                lifecycle: Arc::new(Lifecycle::new()),
                bus: Arc::new(EventBus::new()),
                wiring: Arc::new(WiringTable::new()),
            },
            state: RunStateCell::new(RunState::Booting),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// The shared handle bundle passed to catalogue code.
    #[must_use]
    pub fn context(&self) -> &BootContext {
        &self.ctx
    }

    /// Current run state.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        self.state.load()
    }

    /// Token that triggers the shutdown path when cancelled.
    ///
    /// The OS interrupt path cancels it too, so tests and embedders can
    /// share one mechanism.
    #[must_use]
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs the boot sequence: validation, bus start, ordered steps, then
    /// the staged load phase.
    ///
    /// Only catalogue validation can fail here; every per-step and
    /// per-stage failure is isolated and recorded in the returned summary.
    pub async fn boot(&self, catalog: &BootCatalog) -> Result<BootSummary, ConfigError> {
        catalog.validate()?;
        self.state.store(RunState::Booting);

        self.ctx.bus.start();
        info!(
            steps = catalog.steps.len(),
            stages = catalog.stages.len(),
            "boot sequence starting"
        );

        let boot = BootSequencer::run(&self.ctx, &catalog.steps).await;
        info!(succeeded = boot.succeeded(), failed = boot.failed(), "boot steps complete");

        let loader = StagedLoader::new(self.ctx.config.settle);
        let load = loader
            .load_all(&self.ctx, &catalog.stages, &catalog.secondary)
            .await;

        self.state.store(RunState::Running);
        self.ctx.bus.publish(
            "runtime.boot_completed",
            json!({
                "steps_ok": boot.succeeded(),
                "steps_failed": boot.failed(),
                "stages_loaded": load.loaded(),
            }),
            "orchestrator",
        );

        Ok(BootSummary { boot, load })
    }

    /// Runs the supervisory loop until an interrupt (or a cancelled
    /// shutdown handle), then drives the shutdown path exactly once.
    ///
    /// Each tick executes the declared propagations in order; a failing or
    /// panicking propagation is isolated and neither stops the remaining
    /// pairs in the same tick nor future ticks. A tick never overlaps the
    /// next one.
    pub async fn run(&self, propagations: &[PropagationRef]) {
        self.run_until(propagations, shutdown::wait_for_interrupt())
            .await;
    }

    /// Supervisory loop body with an injectable interrupt source.
    ///
    /// The interrupt future is pinned once, outside the loop, so a signal
    /// that arrives while a tick is executing is retained by the listener
    /// and observed on the next select pass instead of being dropped with a
    /// per-iteration future.
    pub(crate) async fn run_until<F>(&self, propagations: &[PropagationRef], interrupt: F)
    where
        F: Future<Output = std::io::Result<()>>,
    {
        let mut interval = tokio::time::interval(self.ctx.config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(interrupt);

        loop {
            tokio::select! {
                res = &mut interrupt => {
                    if let Err(e) = res {
                        error!(error = %e, "signal listener failed; shutting down");
                    } else {
                        info!("interrupt received; shutting down");
                    }
                    break;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("shutdown requested; shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.run_tick(propagations).await;
                }
            }
        }

        self.shutdown().await;
    }

    /// One propagation pass. Public mainly for embedders that drive their
    /// own loop.
    pub async fn run_tick(&self, propagations: &[PropagationRef]) {
        for propagation in propagations {
            let label = propagation.label();
            match std::panic::AssertUnwindSafe(propagation.propagate(&self.ctx))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(propagation = %label, error = %e, "propagation failed; isolated");
                }
                Err(panic) => {
                    let msg = panic_message(&*panic);
                    warn!(propagation = %label, panic = %msg, "propagation panicked; isolated");
                }
            }
        }
    }

    /// The shutdown path: stop, join with per-service budget, stop the bus.
    ///
    /// Idempotent — a second call returns immediately, so the path runs at
    /// most once even if an embedder calls it alongside `run`.
    pub async fn shutdown(&self) {
        // Concurrent callers race on the state transition; exactly one
        // proceeds past this point.
        if !self.state.begin_shutdown() {
            return;
        }

        self.ctx.bus.publish(
            "runtime.shutdown",
            json!({"reason": "interrupt"}),
            "orchestrator",
        );

        // A second interrupt while stopping forces immediate exit instead
        // of re-entering the shutdown logic. The listener lives only for
        // the duration of the stop/join sequence; once it completes, signal
        // handling returns to the embedding application.
        tokio::select! {
            () = async {
                self.ctx.lifecycle.stop_all().await;
                let abandoned = self
                    .ctx
                    .lifecycle
                    .join_all(self.ctx.config.join_timeout)
                    .await;
                if !abandoned.is_empty() {
                    warn!(?abandoned, "services abandoned after join timeout");
                }
            } => {}
            () = async {
                if shutdown::wait_for_interrupt().await.is_ok() {
                    eprintln!("[bootvisor] second interrupt; exiting immediately");
                    std::process::exit(130);
                }
                // Listener registration failed; never force-exit, just let
                // the stop/join sequence finish.
                std::future::pending::<()>().await;
            } => {}
        }

        self.ctx.bus.stop();
        self.state.store(RunState::Stopped);
        info!("shutdown complete");
    }

    /// Structured snapshot for external tooling (a status CLI).
    ///
    /// Subsystems that do not implement introspection report
    /// `"not available"`.
    pub async fn status(&self) -> StatusReport {
        let state = self.state.load();
        let subsystems = self
            .ctx
            .registry
            .all()
            .into_iter()
            .map(|h| crate::status::SubsystemStatus {
                name: h.name.to_string(),
                status: h.instance.status(),
            })
            .collect();

        StatusReport {
            initialized: !matches!(state, RunState::Booting),
            run_state: state,
            running_services: self.ctx.lifecycle.running_count().await,
            subsystems,
        }
    }

    /// Convenience for boot steps: registers a service and, when it is
    /// Background-kind, immediately starts its run loop.
    pub async fn start_background(
        &self,
        name: &str,
    ) -> Result<(), crate::error::RegistryError> {
        let handle = self.ctx.registry.get(name)?;
        if handle.kind == ServiceKind::Background {
            self.ctx.lifecycle.start(handle).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PropagationFn, StepFn};
    use crate::error::ServiceError;
    use crate::registry::ServiceKind;
    use crate::services::ServiceFn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn quick_config() -> Config {
        Config {
            settle: Duration::from_millis(1),
            tick: Duration::from_millis(10),
            join_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn boot_then_shutdown_transitions_run_state() {
        let orch = Orchestrator::new(quick_config());
        assert_eq!(orch.run_state(), RunState::Booting);

        let catalog = BootCatalog::new().with_step(StepFn::arc(
            "broca",
            |ctx: BootContext| async move {
                let svc = ServiceFn::arc("broca", |token: CancellationToken| async move {
                    token.cancelled().await;
                    Ok(())
                });
                let handle = ctx.registry.register("broca", svc, ServiceKind::Background)?;
                ctx.lifecycle.start(handle).await;
                Ok(())
            },
        ));

        let summary = orch.boot(&catalog).await.unwrap();
        assert_eq!(summary.boot.failed(), 0);
        assert_eq!(orch.run_state(), RunState::Running);
        assert!(orch.context().bus.is_running());
        assert!(orch.context().lifecycle.is_alive("broca").await);

        orch.shutdown().await;
        assert_eq!(orch.run_state(), RunState::Stopped);
        assert!(!orch.context().bus.is_running());
        assert!(!orch.context().lifecycle.is_alive("broca").await);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let orch = Orchestrator::new(quick_config());
        orch.boot(&BootCatalog::new()).await.unwrap();

        orch.shutdown().await;
        assert_eq!(orch.run_state(), RunState::Stopped);
        // Second call must not re-enter stop/join.
        orch.shutdown().await;
        assert_eq!(orch.run_state(), RunState::Stopped);
    }

    #[tokio::test]
    async fn invalid_catalog_aborts_before_boot() {
        let orch = Orchestrator::new(quick_config());
        let catalog = BootCatalog::new()
            .with_step(StepFn::arc("dup", |_ctx| async { Ok(()) }))
            .with_step(StepFn::arc("dup", |_ctx| async { Ok(()) }));

        assert!(orch.boot(&catalog).await.is_err());
        assert_eq!(orch.run_state(), RunState::Booting);
        assert!(orch.context().registry.is_empty());
    }

    #[tokio::test]
    async fn failing_propagation_does_not_stop_others() {
        let orch = Orchestrator::new(quick_config());
        orch.boot(&BootCatalog::new()).await.unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let propagations: Vec<PropagationRef> = vec![
            PropagationFn::arc("hypothalamus->limbic", |_ctx| async {
                Err(ServiceError::failed("sensor read failed"))
            }),
            PropagationFn::arc("hypothalamus->occipital", move |_ctx| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        ];

        orch.run_tick(&propagations).await;
        orch.run_tick(&propagations).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn run_exits_on_shutdown_handle() {
        let orch = Arc::new(Orchestrator::new(quick_config()));
        orch.boot(&BootCatalog::new()).await.unwrap();

        let handle = orch.shutdown_handle();
        let runner = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.run(&[]).await })
        };

        handle.cancel();
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("run() should exit after shutdown handle fires")
            .unwrap();
        assert_eq!(orch.run_state(), RunState::Stopped);
    }

    #[tokio::test]
    async fn interrupt_during_tick_is_not_lost() {
        let orch = Arc::new(Orchestrator::new(quick_config()));
        orch.boot(&BootCatalog::new()).await.unwrap();

        // The interrupt fires from inside a tick, while the propagation is
        // still executing; the pinned listener must retain it for the next
        // select pass.
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));
        let propagations: Vec<PropagationRef> = vec![PropagationFn::arc(
            "raises-interrupt",
            move |_ctx| {
                let tx = tx.clone();
                async move {
                    if let Some(tx) = tx.lock().unwrap().take() {
                        let _ = tx.send(());
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(())
                }
            },
        )];

        let runner = {
            let orch = orch.clone();
            tokio::spawn(async move {
                orch.run_until(&propagations, async move {
                    let _ = rx.await;
                    Ok(())
                })
                .await
            })
        };

        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("an interrupt raised mid-tick must end the loop")
            .unwrap();
        assert_eq!(orch.run_state(), RunState::Stopped);
    }

    struct CountingStop {
        stops: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl crate::services::Service for CountingStop {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
            ctx.cancelled().await;
            Err(ServiceError::Canceled)
        }

        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_shutdown_runs_stop_sequence_once() {
        let orch = Arc::new(Orchestrator::new(quick_config()));
        let stops = Arc::new(AtomicUsize::new(0));

        let counter = stops.clone();
        let catalog = BootCatalog::new().with_step(StepFn::arc(
            "counting",
            move |ctx: BootContext| {
                let counter = counter.clone();
                async move {
                    let svc: crate::services::ServiceRef =
                        Arc::new(CountingStop { stops: counter });
                    let handle =
                        ctx.registry.register("counting", svc, ServiceKind::Background)?;
                    ctx.lifecycle.start(handle).await;
                    Ok(())
                }
            },
        ));
        orch.boot(&catalog).await.unwrap();

        let a = tokio::spawn({
            let orch = orch.clone();
            async move { orch.shutdown().await }
        });
        let b = tokio::spawn({
            let orch = orch.clone();
            async move { orch.shutdown().await }
        });
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(orch.run_state(), RunState::Stopped);
    }

    #[tokio::test]
    async fn status_reports_subsystems_in_order() {
        let orch = Orchestrator::new(quick_config());
        let catalog = BootCatalog::new().with_step(StepFn::arc(
            "sensors",
            |ctx: BootContext| async move {
                for name in ["temporal", "occipital"] {
                    let svc = ServiceFn::arc(name, |_c| async { Ok(()) });
                    ctx.registry.register(name, svc, ServiceKind::Passive)?;
                }
                Ok(())
            },
        ));
        orch.boot(&catalog).await.unwrap();

        let status = orch.status().await;
        assert!(status.initialized);
        assert_eq!(status.run_state, RunState::Running);
        let names: Vec<_> = status
            .subsystems
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, ["temporal", "occipital"]);
        assert_eq!(
            status.subsystems[0].status,
            serde_json::Value::String("not available".to_string())
        );
    }
}
