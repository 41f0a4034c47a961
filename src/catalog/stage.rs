//! # Load stages and secondary initializers.
//!
//! A [`LoadStage`] acquires one heavyweight resource (a model, a large
//! cache, a device allocation). Stages run strictly one at a time with a
//! settle delay between attempts so peak memory/compute stays bounded.
//!
//! A [`SecondaryInit`] is an optional subsystem that depends on the loaded
//! resources (an inference cache, an orchestration layer over several
//! models) and runs after the ordered stage list completes. It may decline
//! with [`LoadError::Skipped`](crate::LoadError::Skipped) when a
//! prerequisite resource failed to load.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::BootContext;
use crate::error::LoadError;

/// Shared handle to a load stage.
pub type StageRef = Arc<dyn LoadStage>;

/// Shared handle to a secondary initializer.
pub type SecondaryRef = Arc<dyn SecondaryInit>;

/// One ordered unit of heavyweight resource acquisition.
#[async_trait]
pub trait LoadStage: Send + Sync + 'static {
    /// Stable layer key ("reflex", "social", "cortical").
    fn key(&self) -> &str;

    /// Human-readable descriptor for the load report ("Qwen-3B").
    fn descriptor(&self) -> &str;

    /// Loads the resource. No timeout; no automatic retry — a failed stage
    /// is skipped for the rest of the process lifetime.
    async fn load(&self, ctx: &BootContext) -> Result<(), LoadError>;
}

/// Optional subsystem initialized after all stages have been attempted.
#[async_trait]
pub trait SecondaryInit: Send + Sync + 'static {
    /// Stable subsystem name for the load report.
    fn name(&self) -> &str;

    /// Initializes the subsystem. Return
    /// [`LoadError::Skipped`](crate::LoadError::Skipped) when a prerequisite
    /// resource is unavailable.
    async fn init(&self, ctx: &BootContext) -> Result<(), LoadError>;
}

/// Function-backed load stage.
pub struct StageFn<F> {
    key: Cow<'static, str>,
    descriptor: Cow<'static, str>,
    f: F,
}

impl<F> StageFn<F> {
    /// Creates a new function-backed stage.
    pub fn new(
        key: impl Into<Cow<'static, str>>,
        descriptor: impl Into<Cow<'static, str>>,
        f: F,
    ) -> Self {
        Self {
            key: key.into(),
            descriptor: descriptor.into(),
            f,
        }
    }

    /// Creates the stage and returns it as a shared handle.
    pub fn arc(
        key: impl Into<Cow<'static, str>>,
        descriptor: impl Into<Cow<'static, str>>,
        f: F,
    ) -> Arc<Self> {
        Arc::new(Self::new(key, descriptor, f))
    }
}

#[async_trait]
impl<F, Fut> LoadStage for StageFn<F>
where
    F: Fn(BootContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), LoadError>> + Send + 'static,
{
    fn key(&self) -> &str {
        &self.key
    }

    fn descriptor(&self) -> &str {
        &self.descriptor
    }

    async fn load(&self, ctx: &BootContext) -> Result<(), LoadError> {
        (self.f)(ctx.clone()).await
    }
}

/// Function-backed secondary initializer.
pub struct SecondaryInitFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> SecondaryInitFn<F> {
    /// Creates a new function-backed secondary initializer.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the initializer and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> SecondaryInit for SecondaryInitFn<F>
where
    F: Fn(BootContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), LoadError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, ctx: &BootContext) -> Result<(), LoadError> {
        (self.f)(ctx.clone()).await
    }
}
