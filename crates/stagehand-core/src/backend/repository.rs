//! Remote action repositories.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use stagehand_types::error::EngineError;

pub trait RepositoryHost: Send + Sync {
    /// Whether `url` answers at all. Any failure counts as unreachable.
    fn is_reachable(&self, url: &str) -> impl Future<Output = bool> + Send;

    /// Make `dir` a checkout of `url` at `git_ref`, cloning or updating as
    /// needed. Implementations serialise checkouts.
    fn checkout(
        &self,
        url: &str,
        git_ref: &str,
        dir: &Path,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// Object-safe version of [`RepositoryHost`].
pub trait RepositoryHostDyn: Send + Sync {
    fn is_reachable_boxed<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

    fn checkout_boxed<'a>(
        &'a self,
        url: &'a str,
        git_ref: &'a str,
        dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;
}

impl<T: RepositoryHost> RepositoryHostDyn for T {
    fn is_reachable_boxed<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(self.is_reachable(url))
    }

    fn checkout_boxed<'a>(
        &'a self,
        url: &'a str,
        git_ref: &'a str,
        dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(self.checkout(url, git_ref, dir))
    }
}

#[derive(Clone)]
pub struct BoxRepositoryHost {
    inner: Arc<dyn RepositoryHostDyn>,
}

impl BoxRepositoryHost {
    pub fn new<T: RepositoryHost + 'static>(host: T) -> Self {
        Self {
            inner: Arc::new(host),
        }
    }

    pub async fn is_reachable(&self, url: &str) -> bool {
        self.inner.is_reachable_boxed(url).await
    }

    pub async fn checkout(&self, url: &str, git_ref: &str, dir: &Path) -> Result<(), EngineError> {
        self.inner.checkout_boxed(url, git_ref, dir).await
    }
}
