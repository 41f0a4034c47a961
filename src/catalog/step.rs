//! # Boot steps.
//!
//! A [`BootStep`] is one ordered unit of initialization: it constructs
//! services, registers them, starts background run loops, and declares
//! wiring edges — all through the [`BootContext`] it receives. Steps are
//! isolated from each other: a failing step is logged and recorded, and the
//! sequencer proceeds to the next one.
//!
//! A step that depends on a service from an earlier, failed step must
//! tolerate the missing registry entry (declare the wiring edge anyway — it
//! stays pending — or skip the capability), so the whole step still
//! succeeds in degraded form.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::BootContext;
use crate::error::StepError;

/// Shared handle to a boot step.
pub type StepRef = Arc<dyn BootStep>;

/// One ordered, isolated unit of initialization.
///
/// ## Example
/// ```
/// use async_trait::async_trait;
/// use bootvisor::{BootContext, BootStep, ServiceFn, ServiceKind, StepError};
///
/// struct RegisterMemory;
///
/// #[async_trait]
/// impl BootStep for RegisterMemory {
///     fn label(&self) -> &str { "memory" }
///
///     async fn execute(&self, ctx: &BootContext) -> Result<(), StepError> {
///         let svc = ServiceFn::arc("memory", |_ctx| async { Ok(()) });
///         ctx.registry.register("memory", svc, ServiceKind::Passive)?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait BootStep: Send + Sync + 'static {
    /// Returns a stable, human-readable step label for the boot report.
    fn label(&self) -> &str;

    /// Executes the step.
    ///
    /// There is no timeout: a hanging step blocks the rest of boot. This is
    /// a known, accepted risk inherited from the supervised system.
    async fn execute(&self, ctx: &BootContext) -> Result<(), StepError>;
}

/// Function-backed boot step.
///
/// Wraps a closure `F: Fn(BootContext) -> Fut`; the context is cloned per
/// execution (it is a bundle of `Arc`s).
pub struct StepFn<F> {
    label: Cow<'static, str>,
    f: F,
}

impl<F> StepFn<F> {
    /// Creates a new function-backed step.
    pub fn new(label: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }

    /// Creates the step and returns it as a shared handle.
    pub fn arc(label: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(label, f))
    }
}

#[async_trait]
impl<F, Fut> BootStep for StepFn<F>
where
    F: Fn(BootContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
    fn label(&self) -> &str {
        &self.label
    }

    async fn execute(&self, ctx: &BootContext) -> Result<(), StepError> {
        (self.f)(ctx.clone()).await
    }
}
