//! # bootvisor
//!
//! **Bootvisor** is a boot-and-supervision runtime for processes built from
//! many independently developed, stateful services.
//!
//! It sequences initialization in strict dependency order with per-step
//! failure isolation, paces heavyweight resource loading so peak usage stays
//! bounded, wires cross-service connections in two idempotent phases, and
//! then supervises the assembled system with a fixed-period propagation loop
//! until an interrupt drives a bounded, per-service shutdown.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   BootStep   │   │  LoadStage   │   │ Propagation  │
//!     │ (ordered     │   │ (settle-     │   │ (per-tick    │
//!     │  init)       │   │  paced load) │   │  state flow) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                     │
//! │  - ServiceRegistry (name → singleton handle, registration order)  │
//! │  - Lifecycle (start/stop/join background run loops)               │
//! │  - EventBus (topic-keyed pub/sub, isolated synchronous delivery)  │
//! │  - WiringTable (two-phase idempotent cross-service edges)         │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Service    │   │   Service    │   │   Service    │
//!     │ (run loop,   │   │ (passive)    │   │ (run loop)   │
//!     │  Background) │   │              │   │              │
//!     └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! BootCatalog ──► Orchestrator::boot()
//!
//!   catalog.validate()            ── the only fatal gate
//!   bus.start()
//!   for each BootStep, in order:
//!     ├─ Ok      ─► Succeeded
//!     ├─ Err     ─► Failed, log, continue
//!     └─ panic   ─► Failed, log, continue
//!   wiring.connect()              ── second phase, deferred edges apply
//!   for each LoadStage, in order:
//!     ├─ load (isolated like steps)
//!     └─ sleep(settle)            ── after every attempt
//!   secondary initializers        ── Ready | Skipped | Failed
//!   state = Running
//!
//! Orchestrator::run(propagations)
//!
//!   loop every `tick`:
//!     each propagation, isolated
//!   until interrupt or shutdown handle:
//!     lifecycle.stop_all()        ── cancel tokens, per-service stop()
//!     lifecycle.join_all(budget)  ── per-service timeout, abandon stragglers
//!     bus.stop()
//!     state = Stopped
//! ```
//!
//! ## Features
//! | Area            | Description                                                      | Key types / traits                         |
//! |-----------------|------------------------------------------------------------------|--------------------------------------------|
//! | **Catalogue**   | Declare boot steps, load stages, and propagations.               | [`BootCatalog`], [`BootStep`], [`LoadStage`] |
//! | **Services**    | Stateful singletons, passive or with a supervised run loop.      | [`Service`], [`ServiceFn`], [`ServiceKind`] |
//! | **Registry**    | Name → instance map with explicit duplicate handling.            | [`ServiceRegistry`], [`ServiceHandle`]     |
//! | **Events**      | Topic-keyed pub/sub with isolated synchronous delivery.          | [`EventBus`], [`Event`]                    |
//! | **Wiring**      | Two-phase idempotent cross-service connections.                  | [`WiringTable`], [`WireSpec`]              |
//! | **Supervision** | Fixed-period propagation loop and bounded shutdown.              | [`Orchestrator`], [`Lifecycle`]            |
//! | **Errors**      | Typed errors per failure boundary.                               | [`StepError`], [`LoadError`], [`ServiceError`] |
//! | **Status**      | Serializable runtime snapshot for external tooling.              | [`StatusReport`]                           |
//!
//! ## Example
//! ```rust
//! use bootvisor::{
//!     BootCatalog, BootContext, Config, Orchestrator, ServiceFn, ServiceKind, StageFn, StepFn,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orch = Orchestrator::new(Config::default());
//!
//!     let catalog = BootCatalog::new()
//!         .with_step(StepFn::arc("sensor", |ctx: BootContext| async move {
//!             let svc = ServiceFn::arc("sensor", |token: CancellationToken| async move {
//!                 token.cancelled().await;
//!                 Ok(())
//!             });
//!             let handle = ctx.registry.register("sensor", svc, ServiceKind::Background)?;
//!             ctx.lifecycle.start(handle).await;
//!             Ok(())
//!         }))
//!         .with_stage(StageFn::arc("reflex", "reflex model", |_ctx| async {
//!             // load the heavyweight resource here
//!             Ok(())
//!         }));
//!
//!     let summary = orch.boot(&catalog).await?;
//!     println!("{}", summary.boot);
//!
//!     // Runs the supervisory loop until an interrupt, then shuts down.
//!     // orch.run(&catalog.propagations).await;
//!     orch.shutdown().await;
//!     Ok(())
//! }
//! ```
mod catalog;
mod config;
mod core;
mod error;
mod events;
mod registry;
mod services;
mod status;
mod wiring;

// ---- Public re-exports ----

pub use catalog::{
    BootCatalog, BootStep, LoadStage, Propagation, PropagationFn, PropagationRef, SecondaryInit,
    SecondaryInitFn, SecondaryRef, StageFn, StageRef, StepFn, StepRef,
};
pub use config::Config;
pub use core::{
    BootContext, BootEntry, BootReport, BootSequencer, BootSummary, Lifecycle, LoadReport,
    Orchestrator, RunState, SecondaryEntry, SecondaryOutcome, StageEntry, StageOutcome,
    StagedLoader, StepOutcome,
};
pub use error::{
    ConfigError, LoadError, RegistryError, ServiceError, StepError, WiringError,
};
pub use events::{Event, EventBus, SubscriptionId};
pub use registry::{ServiceHandle, ServiceKind, ServiceRegistry};
pub use services::{Service, ServiceFn, ServiceRef};
pub use status::{StatusReport, SubsystemStatus};
pub use wiring::{WireSpec, WiringTable};
