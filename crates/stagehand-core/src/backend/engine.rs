//! Container engine port.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use stagehand_types::container::ContainerSpec;
use stagehand_types::error::EngineError;
use tokio_util::sync::CancellationToken;

/// Stores images and runs containers.
pub trait ContainerEngine: Send + Sync {
    fn image_exists(&self, image: &str)
    -> impl Future<Output = Result<bool, EngineError>> + Send;

    fn pull(&self, image: &str) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Build `context_dir/Dockerfile` and tag the result.
    fn build(
        &self,
        context_dir: &Path,
        tag: &str,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Create, start and wait for a container. Resolves once it has exited.
    fn run(
        &self,
        spec: &ContainerSpec,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// Object-safe version of [`ContainerEngine`] with boxed futures.
pub trait ContainerEngineDyn: Send + Sync {
    fn image_exists_boxed<'a>(
        &'a self,
        image: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, EngineError>> + Send + 'a>>;

    fn pull_boxed<'a>(
        &'a self,
        image: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;

    fn build_boxed<'a>(
        &'a self,
        context_dir: &'a Path,
        tag: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;

    fn run_boxed<'a>(
        &'a self,
        spec: &'a ContainerSpec,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;
}

impl<T: ContainerEngine> ContainerEngineDyn for T {
    fn image_exists_boxed<'a>(
        &'a self,
        image: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, EngineError>> + Send + 'a>> {
        Box::pin(self.image_exists(image))
    }

    fn pull_boxed<'a>(
        &'a self,
        image: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(self.pull(image))
    }

    fn build_boxed<'a>(
        &'a self,
        context_dir: &'a Path,
        tag: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(self.build(context_dir, tag))
    }

    fn run_boxed<'a>(
        &'a self,
        spec: &'a ContainerSpec,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(self.run(spec, cancel))
    }
}

/// Type-erased engine, shared by every step of a run.
#[derive(Clone)]
pub struct BoxContainerEngine {
    inner: Arc<dyn ContainerEngineDyn>,
}

impl BoxContainerEngine {
    pub fn new<T: ContainerEngine + 'static>(engine: T) -> Self {
        Self {
            inner: Arc::new(engine),
        }
    }

    pub async fn image_exists(&self, image: &str) -> Result<bool, EngineError> {
        self.inner.image_exists_boxed(image).await
    }

    pub async fn pull(&self, image: &str) -> Result<(), EngineError> {
        self.inner.pull_boxed(image).await
    }

    pub async fn build(&self, context_dir: &Path, tag: &str) -> Result<(), EngineError> {
        self.inner.build_boxed(context_dir, tag).await
    }

    pub async fn run(
        &self,
        spec: &ContainerSpec,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.inner.run_boxed(spec, cancel).await
    }
}
