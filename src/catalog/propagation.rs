//! # Supervisory propagations.
//!
//! A [`Propagation`] reads authoritative state from a "source" service and
//! writes derived state into a "sink" service (a biological/resource state
//! flowing into an emotional or rendering state, a thermal budget flowing
//! into a sensor's frame rate). The supervisory loop runs the declared list
//! once per tick; each propagation is isolated, so one failure neither
//! stops the others in the same tick nor stops future ticks.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::BootContext;
use crate::error::ServiceError;

/// Shared handle to a propagation.
pub type PropagationRef = Arc<dyn Propagation>;

/// One source→sink state propagation, run every tick.
#[async_trait]
pub trait Propagation: Send + Sync + 'static {
    /// Stable label for logs ("hypothalamus->limbic").
    fn label(&self) -> &str;

    /// Performs one propagation pass. Resolve endpoints through the
    /// registry so a missing service degrades this pair only.
    async fn propagate(&self, ctx: &BootContext) -> Result<(), ServiceError>;
}

/// Function-backed propagation.
pub struct PropagationFn<F> {
    label: Cow<'static, str>,
    f: F,
}

impl<F> PropagationFn<F> {
    /// Creates a new function-backed propagation.
    pub fn new(label: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }

    /// Creates the propagation and returns it as a shared handle.
    pub fn arc(label: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(label, f))
    }
}

#[async_trait]
impl<F, Fut> Propagation for PropagationFn<F>
where
    F: Fn(BootContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    fn label(&self) -> &str {
        &self.label
    }

    async fn propagate(&self, ctx: &BootContext) -> Result<(), ServiceError> {
        (self.f)(ctx.clone()).await
    }
}
