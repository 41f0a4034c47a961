//! # Two-phase wiring between services.
//!
//! A wiring edge is a runtime-established reference from one service into a
//! capability of another ("stop my audio output", "fetch my latest frame").
//! Because boot order does not match dependency order for every module, an
//! edge declared before its endpoints exist is **deferred** and re-applied
//! by a later [`WiringTable::connect`] pass.
//!
//! ## Rules
//! - Edges are stored **as data** ({label, required service names, apply
//!   callback over the registry}), never as closures capturing possibly
//!   absent references.
//! - `connect()` is idempotent: a successfully applied edge is never run
//!   again, so repeated re-connect passes cannot duplicate callback
//!   registrations.
//! - Declaring an edge with an existing label **rebinds** the capability:
//!   the old edge is dropped, the new one starts unapplied.
//! - A missing dependency or a failing apply leaves the edge pending and
//!   logs the capability as degraded; the step that declared it still
//!   succeeds (graceful degradation).

use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::error::WiringError;
use crate::registry::ServiceRegistry;

/// Callback that establishes the edge once all endpoints exist.
///
/// Receives the registry so it resolves endpoints at apply time rather than
/// capturing them at declaration time.
pub type Apply = Arc<dyn Fn(&ServiceRegistry) -> Result<(), WiringError> + Send + Sync>;

/// Declaration of one wiring edge.
#[derive(Clone)]
pub struct WireSpec {
    /// Capability label; redeclaring a label rebinds the edge.
    pub label: Arc<str>,
    /// Service names that must be registered before `apply` runs.
    pub requires: Vec<Arc<str>>,
    /// Establishes the edge.
    pub apply: Apply,
}

impl WireSpec {
    /// Creates an edge declaration.
    pub fn new(
        label: impl Into<Arc<str>>,
        requires: impl IntoIterator<Item = impl Into<Arc<str>>>,
        apply: impl Fn(&ServiceRegistry) -> Result<(), WiringError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            requires: requires.into_iter().map(Into::into).collect(),
            apply: Arc::new(apply),
        }
    }
}

struct EdgeState {
    spec: WireSpec,
    applied: bool,
}

/// Table of declared edges with deferred, idempotent application.
#[derive(Default)]
pub struct WiringTable {
    edges: RwLock<Vec<EdgeState>>,
}

impl WiringTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an edge. Rebinds (replaces) any edge with the same label.
    pub fn wire(&self, spec: WireSpec) {
        let mut edges = self.edges.write().unwrap();
        match edges.iter_mut().find(|e| e.spec.label == spec.label) {
            Some(existing) => {
                debug!(edge = %spec.label, "rebinding wiring edge");
                existing.spec = spec;
                existing.applied = false;
            }
            None => edges.push(EdgeState {
                spec,
                applied: false,
            }),
        }
    }

    /// Attempts to apply every pending edge whose dependencies are all
    /// registered. Returns how many edges were applied in this pass.
    ///
    /// Safe to call repeatedly; applied edges are skipped. An edge whose
    /// apply fails stays pending (a later pass may retry once the missing
    /// piece shows up) and is logged as a degraded capability.
    pub fn connect(&self, registry: &ServiceRegistry) -> usize {
        let mut edges = self.edges.write().unwrap();
        let mut applied = 0;

        for edge in edges.iter_mut().filter(|e| !e.applied) {
            let missing = edge
                .spec
                .requires
                .iter()
                .find(|name| !registry.contains(name));
            if let Some(name) = missing {
                let deferred = WiringError::DependencyUnavailable {
                    edge: edge.spec.label.to_string(),
                    missing: name.to_string(),
                };
                warn!(
                    error = %deferred,
                    "wiring deferred; capability degraded until dependency appears"
                );
                continue;
            }

            match (edge.spec.apply)(registry) {
                Ok(()) => {
                    debug!(edge = %edge.spec.label, "wiring edge applied");
                    edge.applied = true;
                    applied += 1;
                }
                Err(e) => {
                    warn!(edge = %edge.spec.label, error = %e, "wiring failed; capability degraded");
                }
            }
        }
        applied
    }

    /// Labels of edges not yet applied.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        self.edges
            .read()
            .unwrap()
            .iter()
            .filter(|e| !e.applied)
            .map(|e| e.spec.label.to_string())
            .collect()
    }

    /// Number of edges applied so far.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.edges
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.applied)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServiceKind;
    use crate::services::{ServiceFn, ServiceRef};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn passive(name: &'static str) -> ServiceRef {
        ServiceFn::arc(name, |_ctx| async { Ok(()) })
    }

    #[test]
    fn edge_defers_until_dependency_registered() {
        let registry = ServiceRegistry::new();
        let table = WiringTable::new();
        let applies = Arc::new(AtomicUsize::new(0));

        let counter = applies.clone();
        table.wire(WireSpec::new("brainstem->broca", ["broca"], move |_reg| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        assert_eq!(table.connect(&registry), 0);
        assert_eq!(table.pending(), vec!["brainstem->broca".to_string()]);

        registry
            .register("broca", passive("broca"), ServiceKind::Background)
            .unwrap();
        assert_eq!(table.connect(&registry), 1);
        assert_eq!(applies.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reconnect_is_idempotent() {
        let registry = ServiceRegistry::new();
        registry
            .register("occipital", passive("occipital"), ServiceKind::Background)
            .unwrap();

        let table = WiringTable::new();
        let applies = Arc::new(AtomicUsize::new(0));
        let counter = applies.clone();
        table.wire(WireSpec::new(
            "consciousness->occipital",
            ["occipital"],
            move |_reg| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        ));

        table.connect(&registry);
        table.connect(&registry);
        table.connect(&registry);
        assert_eq!(applies.load(Ordering::SeqCst), 1);
        assert_eq!(table.applied_count(), 1);
    }

    #[test]
    fn rebinding_replaces_earlier_edge() {
        let registry = ServiceRegistry::new();
        registry
            .register("motion", passive("motion"), ServiceKind::Background)
            .unwrap();

        let table = WiringTable::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let c = first.clone();
        table.wire(WireSpec::new("gaze", ["motion"], move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        let c = second.clone();
        table.wire(WireSpec::new("gaze", ["motion"], move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        table.connect(&registry);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_apply_stays_pending() {
        let registry = ServiceRegistry::new();
        registry
            .register("camera", passive("camera"), ServiceKind::Background)
            .unwrap();

        let table = WiringTable::new();
        table.wire(WireSpec::new("servo", ["camera"], |_reg| {
            Err(WiringError::Failed {
                edge: "servo".to_string(),
                error: "device busy".to_string(),
            })
        }));

        assert_eq!(table.connect(&registry), 0);
        assert_eq!(table.pending(), vec!["servo".to_string()]);
    }
}
