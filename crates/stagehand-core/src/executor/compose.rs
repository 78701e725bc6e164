use std::future::Future;
use std::sync::Arc;

use stagehand_types::config::StagePolicy;
use stagehand_types::error::RunError;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{BoxExecutor, Executor};

// ---------------------------------------------------------------------------
// AlwaysFails
// ---------------------------------------------------------------------------

/// Yields a stored error immediately.
#[derive(Debug, Clone)]
pub struct AlwaysFails {
    error: RunError,
}

impl AlwaysFails {
    pub fn new(error: RunError) -> Self {
        Self { error }
    }
}

impl Executor for AlwaysFails {
    async fn execute(&self, _cancel: &CancellationToken) -> Result<(), RunError> {
        Err(self.error.clone())
    }
}

// ---------------------------------------------------------------------------
// Sequential
// ---------------------------------------------------------------------------

/// Runs its steps in order on the calling task, stopping at the first error.
#[derive(Debug, Clone, Default)]
pub struct Sequential {
    steps: Vec<BoxExecutor>,
}

impl Sequential {
    pub fn new(steps: Vec<BoxExecutor>) -> Self {
        Self { steps }
    }
}

impl Executor for Sequential {
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), RunError> {
        for step in &self.steps {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }
            step.execute(cancel).await?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Concurrent
// ---------------------------------------------------------------------------

/// Runs every child on its own task and waits for all of them.
///
/// The result is the first error to complete, or success. Children always run
/// to their own conclusion; with [`StagePolicy::CancelSiblings`] they are
/// additionally signalled to stop once one has failed.
#[derive(Debug, Clone, Default)]
pub struct Concurrent {
    children: Vec<BoxExecutor>,
    policy: StagePolicy,
    limit: Option<Arc<Semaphore>>,
}

impl Concurrent {
    pub fn new(children: Vec<BoxExecutor>) -> Self {
        Self {
            children,
            policy: StagePolicy::default(),
            limit: None,
        }
    }

    pub fn with_policy(mut self, policy: StagePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cap how many children run at once. `None` or zero means no cap.
    pub fn with_max_parallel(mut self, max: Option<usize>) -> Self {
        self.limit = max.filter(|n| *n > 0).map(|n| Arc::new(Semaphore::new(n)));
        self
    }
}

impl Executor for Concurrent {
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), RunError> {
        let siblings = cancel.child_token();
        let mut join_set = JoinSet::new();

        for child in &self.children {
            let child = child.clone();
            let token = siblings.clone();
            let limit = self.limit.clone();
            join_set.spawn(async move {
                let _permit = match limit {
                    Some(semaphore) => Some(
                        semaphore
                            .acquire_owned()
                            .await
                            .map_err(|e| RunError::Internal(e.to_string()))?,
                    ),
                    None => None,
                };
                child.execute(&token).await
            });
        }

        let mut first_error = None;
        while let Some(joined) = join_set.join_next().await {
            let result = joined
                .unwrap_or_else(|e| Err(RunError::Internal(format!("task join error: {e}"))));
            let Err(err) = result else { continue };

            if first_error.is_some() {
                tracing::debug!(error = %err, "additional failure in concurrent group");
                continue;
            }
            if self.policy == StagePolicy::CancelSiblings {
                siblings.cancel();
            }
            first_error = Some(err);
        }

        first_error.map_or(Ok(()), Err)
    }
}

// ---------------------------------------------------------------------------
// Instrumented
// ---------------------------------------------------------------------------

/// Runs the inner executor inside a tracing span.
#[derive(Debug, Clone)]
pub struct Instrumented {
    inner: BoxExecutor,
    span: tracing::Span,
}

impl Instrumented {
    pub fn new(inner: BoxExecutor, span: tracing::Span) -> Self {
        Self { inner, span }
    }
}

impl Executor for Instrumented {
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), RunError> {
        self.inner
            .execute(cancel)
            .instrument(self.span.clone())
            .await
    }
}

// ---------------------------------------------------------------------------
// FnExecutor
// ---------------------------------------------------------------------------

/// Executor backed by a closure returning a future.
pub struct FnExecutor<F> {
    f: F,
}

impl<F, Fut> FnExecutor<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), RunError>> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> Executor for FnExecutor<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), RunError>> + Send,
{
    fn execute(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), RunError>> + Send {
        (self.f)(cancel.clone())
    }
}
