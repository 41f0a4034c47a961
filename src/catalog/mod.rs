//! Declarative catalogues executed by the runtime.
//!
//! A [`BootCatalog`] bundles everything the orchestrator runs at startup:
//! ordered boot steps, ordered load stages, optional secondary subsystem
//! initializers, and the supervisory propagations executed every tick.
//! Catalogues are transient — executed once, discarded after boot (the
//! propagation list lives on in the supervisory loop).
//!
//! Validation is the only fatal gate in the runtime: a malformed catalogue
//! aborts before boot starts, everything after that is catch-log-continue.

mod propagation;
mod stage;
mod step;

pub use propagation::{Propagation, PropagationFn, PropagationRef};
pub use stage::{LoadStage, SecondaryInit, SecondaryInitFn, SecondaryRef, StageFn, StageRef};
pub use step::{BootStep, StepFn, StepRef};

use crate::error::ConfigError;

/// Everything the orchestrator executes at startup, in declared order.
#[derive(Default)]
pub struct BootCatalog {
    /// Ordered initialization steps.
    pub steps: Vec<StepRef>,
    /// Ordered heavyweight resource loads (the final boot phase).
    pub stages: Vec<StageRef>,
    /// Optional subsystems initialized after all stages complete.
    pub secondary: Vec<SecondaryRef>,
    /// Source→sink propagations run every supervisory tick.
    pub propagations: Vec<PropagationRef>,
}

impl BootCatalog {
    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a boot step.
    #[must_use]
    pub fn with_step(mut self, step: StepRef) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends a load stage.
    #[must_use]
    pub fn with_stage(mut self, stage: StageRef) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends a secondary initializer.
    #[must_use]
    pub fn with_secondary(mut self, init: SecondaryRef) -> Self {
        self.secondary.push(init);
        self
    }

    /// Appends a supervisory propagation.
    #[must_use]
    pub fn with_propagation(mut self, propagation: PropagationRef) -> Self {
        self.propagations.push(propagation);
        self
    }

    /// Validates labels and keys: non-empty and unique per section.
    ///
    /// This runs before any step executes; failure is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_labels("step", self.steps.iter().map(|s| s.label()))?;
        validate_labels("stage", self.stages.iter().map(|s| s.key()))?;
        validate_labels("secondary", self.secondary.iter().map(|s| s.name()))?;
        validate_labels("propagation", self.propagations.iter().map(|p| p.label()))?;
        Ok(())
    }
}

fn validate_labels<'a>(
    what: &'static str,
    labels: impl Iterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for (index, label) in labels.enumerate() {
        if label.trim().is_empty() {
            return Err(ConfigError::EmptyLabel { what, index });
        }
        if !seen.insert(label.to_string()) {
            return Err(ConfigError::DuplicateLabel {
                what,
                label: label.to_string(),
            });
        }
    }
    Ok(())
}
