//! Deferred, composable units of work.
//!
//! Every piece of a run (image pulls, builds, checkouts, container runs) is an
//! [`Executor`]. Executors compose with [`Sequential`] and [`Concurrent`] into
//! the tree the Runner executes, and failures discovered while the tree is
//! being built are captured in [`AlwaysFails`] so construction never aborts
//! half-way.
//!
//! Dynamic dispatch follows the usual blanket-impl pattern:
//! 1. [`Executor`] uses RPITIT async methods
//! 2. [`ExecutorDyn`] is the object-safe mirror with boxed futures
//! 3. [`BoxExecutor`] wraps `Arc<dyn ExecutorDyn>` and is cheap to clone

mod compose;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use stagehand_types::error::RunError;
use tokio_util::sync::CancellationToken;

pub use compose::{AlwaysFails, Concurrent, FnExecutor, Instrumented, Sequential};

/// A deferred, fallible operation.
///
/// Implementations should return promptly with [`RunError::Cancelled`] once
/// `cancel` fires, if they can.
pub trait Executor: Send + Sync {
    fn execute(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), RunError>> + Send;
}

/// Object-safe version of [`Executor`] with boxed futures.
pub trait ExecutorDyn: Send + Sync {
    fn execute_boxed<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunError>> + Send + 'a>>;
}

impl<T: Executor> ExecutorDyn for T {
    fn execute_boxed<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunError>> + Send + 'a>> {
        Box::pin(self.execute(cancel))
    }
}

/// Type-erased executor so heterogeneous steps can sit in one list.
#[derive(Clone)]
pub struct BoxExecutor {
    inner: Arc<dyn ExecutorDyn>,
}

impl BoxExecutor {
    pub fn new<T: Executor + 'static>(executor: T) -> Self {
        Self {
            inner: Arc::new(executor),
        }
    }

    /// An executor that yields `err` as soon as it runs.
    pub fn failing(err: RunError) -> Self {
        Self::new(AlwaysFails::new(err))
    }
}

impl Executor for BoxExecutor {
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), RunError> {
        self.inner.execute_boxed(cancel).await
    }
}

impl fmt::Debug for BoxExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxExecutor").finish_non_exhaustive()
    }
}
