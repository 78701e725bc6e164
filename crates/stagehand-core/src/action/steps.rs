//! Executors for the individual steps of an action.
//!
//! In dry-run mode every step logs what it would do and succeeds without
//! touching the engine or the network.

use std::path::PathBuf;
use std::sync::Arc;

use stagehand_types::container::ContainerSpec;
use stagehand_types::error::RunError;
use tokio_util::sync::CancellationToken;

use super::assembler::EnvironmentPlan;
use crate::backend::{BoxContainerEngine, BoxRepositoryHost};
use crate::executor::{BoxExecutor, Executor};
use crate::secret::SecretStore;

/// Preparation an action needs before its container can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupStep {
    Pull {
        image: String,
    },
    Build {
        context_dir: PathBuf,
        tag: String,
    },
    Checkout {
        url: String,
        git_ref: String,
        dir: PathBuf,
    },
}

impl SetupStep {
    pub fn into_executor(
        self,
        engine: &BoxContainerEngine,
        repositories: &BoxRepositoryHost,
        dryrun: bool,
    ) -> BoxExecutor {
        match self {
            Self::Pull { image } => BoxExecutor::new(PullImage {
                engine: engine.clone(),
                image,
                dryrun,
            }),
            Self::Build { context_dir, tag } => BoxExecutor::new(BuildImage {
                engine: engine.clone(),
                context_dir,
                tag,
                dryrun,
            }),
            Self::Checkout { url, git_ref, dir } => BoxExecutor::new(CheckoutRepository {
                repositories: repositories.clone(),
                url,
                git_ref,
                dir,
                dryrun,
            }),
        }
    }
}

fn cancelled_or(cancel: &CancellationToken, err: impl Into<RunError>) -> RunError {
    if cancel.is_cancelled() {
        RunError::Cancelled
    } else {
        err.into()
    }
}

pub struct PullImage {
    engine: BoxContainerEngine,
    image: String,
    dryrun: bool,
}

impl Executor for PullImage {
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), RunError> {
        tracing::info!(image = %self.image, dryrun = self.dryrun, "pulling image");
        if self.dryrun {
            return Ok(());
        }
        self.engine
            .pull(&self.image)
            .await
            .map_err(|e| cancelled_or(cancel, e))
    }
}

pub struct BuildImage {
    engine: BoxContainerEngine,
    context_dir: PathBuf,
    tag: String,
    dryrun: bool,
}

impl Executor for BuildImage {
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), RunError> {
        tracing::info!(
            tag = %self.tag,
            context = %self.context_dir.display(),
            dryrun = self.dryrun,
            "building image"
        );
        if self.dryrun {
            return Ok(());
        }
        self.engine
            .build(&self.context_dir, &self.tag)
            .await
            .map_err(|e| cancelled_or(cancel, e))
    }
}

pub struct CheckoutRepository {
    repositories: BoxRepositoryHost,
    url: String,
    git_ref: String,
    dir: PathBuf,
    dryrun: bool,
}

impl Executor for CheckoutRepository {
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), RunError> {
        tracing::info!(
            url = %self.url,
            git_ref = %self.git_ref,
            dir = %self.dir.display(),
            dryrun = self.dryrun,
            "checking out action repository"
        );
        if self.dryrun {
            return Ok(());
        }
        self.repositories
            .checkout(&self.url, &self.git_ref, &self.dir)
            .await
            .map_err(|e| cancelled_or(cancel, e))
    }
}

/// Runs the action's container, resolving its environment first.
pub struct RunContainer {
    pub(crate) engine: BoxContainerEngine,
    pub(crate) spec: ContainerSpec,
    pub(crate) environment: EnvironmentPlan,
    pub(crate) secrets: Arc<SecretStore>,
    pub(crate) dryrun: bool,
}

impl Executor for RunContainer {
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), RunError> {
        let secrets = (!self.dryrun).then_some(self.secrets.as_ref());
        let env = self.environment.assemble(secrets).await?;

        tracing::info!(
            container = %self.spec.name,
            image = %self.spec.image,
            entrypoint = ?self.spec.entrypoint,
            cmd = ?self.spec.cmd,
            dryrun = self.dryrun,
            "running container"
        );
        if self.dryrun {
            return Ok(());
        }

        let mut spec = self.spec.clone();
        spec.env = env;
        self.engine
            .run(&spec, cancel)
            .await
            .map_err(|e| cancelled_or(cancel, e))?;

        tracing::info!(container = %spec.name, "container finished");
        Ok(())
    }
}
