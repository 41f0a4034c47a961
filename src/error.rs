//! Error types used by the bootvisor runtime and its catalogues.
//!
//! The taxonomy mirrors the failure model of the orchestrator:
//!
//! - [`ConfigError`] — a malformed catalogue; the only **fatal** class,
//!   surfaced before boot starts.
//! - [`StepError`] / [`LoadError`] / [`WiringError`] — per-step, per-stage,
//!   and per-edge failures; always caught at the orchestrator boundary,
//!   logged, and recorded in the boot/load reports.
//! - [`RegistryError`] — registry misuse (duplicate or missing name);
//!   surfaced to the caller, never swallowed.
//! - [`ServiceError`] — raised by a service's own run loop or a supervisory
//!   propagation; isolated per tick.
//!
//! Error enums provide `as_label()` returning a short stable snake_case
//! label for logs and reports.

use thiserror::Error;

/// Errors raised by the [`ServiceRegistry`](crate::ServiceRegistry).
///
/// These are the only runtime errors that propagate to the caller:
/// registry misuse is a programming error in the boot catalogue, not a
/// degraded-capability condition.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A service with this name is already registered.
    #[error("service '{name}' already registered")]
    Duplicate {
        /// The conflicting service name.
        name: String,
    },

    /// No service with this name is registered.
    #[error("service '{name}' not found")]
    NotFound {
        /// The requested service name.
        name: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::Duplicate { .. } => "registry_duplicate",
            RegistryError::NotFound { .. } => "registry_not_found",
        }
    }
}

/// Fatal catalogue validation errors.
///
/// Raised by [`BootCatalog::validate`](crate::BootCatalog::validate) before
/// any step runs. Unlike every other failure class, these abort boot: a
/// malformed catalogue means the declared order itself cannot be trusted.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A step or stage has an empty label/key.
    #[error("{what} at index {index} has an empty label")]
    EmptyLabel {
        /// Catalogue section ("step", "stage", "secondary", "propagation").
        what: &'static str,
        /// Position in the declared list.
        index: usize,
    },

    /// Two entries in the same catalogue section share a label/key.
    #[error("duplicate {what} label '{label}'")]
    DuplicateLabel {
        /// Catalogue section ("step", "stage", "secondary", "propagation").
        what: &'static str,
        /// The duplicated label.
        label: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::EmptyLabel { .. } => "config_empty_label",
            ConfigError::DuplicateLabel { .. } => "config_duplicate_label",
        }
    }
}

/// A single boot step's failure.
///
/// Caught by the sequencer, logged, and recorded in the
/// [`BootReport`](crate::BootReport); boot continues with the next step.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StepError {
    /// The step's action failed.
    #[error("step failed: {error}")]
    Failed {
        /// Human-readable failure description.
        error: String,
    },

    /// The step could not complete because a registry entry was missing.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl StepError {
    /// Shorthand constructor for [`StepError::Failed`].
    pub fn failed(error: impl Into<String>) -> Self {
        StepError::Failed {
            error: error.into(),
        }
    }
}

/// A single load stage's failure.
///
/// Caught by the loader, logged, and recorded in the
/// [`LoadReport`](crate::LoadReport); remaining stages still run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LoadError {
    /// The resource failed to load.
    #[error("load failed: {error}")]
    Failed {
        /// Human-readable failure description.
        error: String,
    },

    /// A secondary subsystem declined to initialize because a prerequisite
    /// resource is unavailable. Recorded as `Skipped`, not `Failed`.
    #[error("skipped: {reason}")]
    Skipped {
        /// Why the subsystem was skipped.
        reason: String,
    },
}

impl LoadError {
    /// Shorthand constructor for [`LoadError::Failed`].
    pub fn failed(error: impl Into<String>) -> Self {
        LoadError::Failed {
            error: error.into(),
        }
    }

    /// Shorthand constructor for [`LoadError::Skipped`].
    pub fn skipped(reason: impl Into<String>) -> Self {
        LoadError::Skipped {
            reason: reason.into(),
        }
    }
}

/// A wiring edge that could not be applied.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WiringError {
    /// A required service is not (yet) in the registry. The edge stays
    /// pending and may be applied by a later `connect()` pass.
    #[error("edge '{edge}' deferred: service '{missing}' unavailable")]
    DependencyUnavailable {
        /// The edge label.
        edge: String,
        /// The missing service name.
        missing: String,
    },

    /// The edge's apply callback failed.
    #[error("edge '{edge}' failed: {error}")]
    Failed {
        /// The edge label.
        edge: String,
        /// Human-readable failure description.
        error: String,
    },
}

/// Errors raised by a service's run loop or by a supervisory propagation.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service's work failed.
    #[error("service error: {error}")]
    Failed {
        /// Human-readable failure description.
        error: String,
    },

    /// The service observed cancellation and exited its loop.
    ///
    /// Treated as a graceful exit by the lifecycle manager.
    #[error("cancelled")]
    Canceled,
}

impl ServiceError {
    /// Shorthand constructor for [`ServiceError::Failed`].
    pub fn failed(error: impl Into<String>) -> Self {
        ServiceError::Failed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Failed { .. } => "service_failed",
            ServiceError::Canceled => "service_canceled",
        }
    }
}
