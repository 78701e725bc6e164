//! The Runner: owns one run's configuration and scratch space and composes
//! graph building, action resolution and run assembly into an executor tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stagehand_types::config::RunConfig;
use stagehand_types::error::RunError;
use stagehand_types::workflow::WorkflowFile;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::action::overlay::event_overlay;
use crate::action::{ActionResolver, RunAssembler, RunContext};
use crate::backend::Backends;
use crate::document::{load_event_payload, load_workflow_file};
use crate::executor::{
    BoxExecutor, Concurrent, Executor, FnExecutor, Instrumented, Sequential,
};
use crate::graph::{ExecutionGraph, build_execution_graph};
use crate::secret::SecretStore;

const DEFAULT_EVENT: &str = "push";
const EMPTY_EVENT_PAYLOAD: &str = "{}";

pub struct Runner {
    config: RunConfig,
    backends: Backends,
    scratch: TempDir,
    working_dir: PathBuf,
    workflows: WorkflowFile,
    event_name: String,
    event_payload: String,
    secrets: Arc<SecretStore>,
    cancel: CancellationToken,
}

impl Runner {
    /// Prepare a run: scratch directory, absolute working directory, workflow
    /// document, event payload. Any failure aborts construction; a scratch
    /// directory created before the failure is removed again.
    pub async fn new(config: RunConfig, backends: Backends) -> Result<Self, RunError> {
        let scratch = tempfile::Builder::new()
            .prefix("stagehand-")
            .tempdir()
            .map_err(|e| RunError::load("scratch directory", e))?;

        let working_dir = tokio::fs::canonicalize(&config.working_dir)
            .await
            .map_err(|e| {
                RunError::load(
                    format!("working directory {}", config.working_dir.display()),
                    e,
                )
            })?;

        let workflows =
            load_workflow_file(&resolve_path(&working_dir, &config.workflow_path)).await?;

        let event_payload = match &config.event_path {
            Some(path) => load_event_payload(&resolve_path(&working_dir, path)).await?,
            None => EMPTY_EVENT_PAYLOAD.to_string(),
        };

        let event_name = config
            .event_name
            .clone()
            .unwrap_or_else(|| default_event(&workflows));

        let secrets = Arc::new(SecretStore::new(
            backends.secret_sources.clone(),
            Arc::clone(&backends.prompt),
        ));

        tracing::debug!(
            working_dir = %working_dir.display(),
            scratch = %scratch.path().display(),
            event = %event_name,
            "runner ready"
        );

        Ok(Self {
            config,
            backends,
            scratch,
            working_dir,
            workflows,
            event_name,
            event_payload,
            secrets,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn workflows(&self) -> &WorkflowFile {
        &self.workflows
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// The event `run_event` runs.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Fires cancellation into every executor of this run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Every trigger event in the document, sorted.
    pub fn list_events(&self) -> Vec<String> {
        self.workflows.events()
    }

    /// Stages for the workflow bound to `event`.
    pub fn graph_event(&self, event: &str) -> Result<ExecutionGraph, RunError> {
        let (_, workflow) = self
            .workflows
            .workflow_for_event(event)
            .ok_or_else(|| RunError::EventNotFound(event.to_string()))?;
        self.graph_actions(&workflow.resolves)
    }

    pub fn graph_actions(&self, ids: &[String]) -> Result<ExecutionGraph, RunError> {
        Ok(build_execution_graph(
            ids,
            |id| self.workflows.action(id),
            self.config.strict_needs,
        )?)
    }

    /// Run the configured event's workflow.
    pub async fn run_event(&self) -> Result<(), RunError> {
        let (name, workflow) = self
            .workflows
            .workflow_for_event(&self.event_name)
            .ok_or_else(|| RunError::EventNotFound(self.event_name.clone()))?;
        tracing::info!(event = %self.event_name, workflow = %name, roots = ?workflow.resolves, "running event");
        self.run_actions(&workflow.resolves).await
    }

    /// Run `ids` and everything they need.
    pub async fn run_actions(&self, ids: &[String]) -> Result<(), RunError> {
        let executor = self.build_executor(ids).await?;
        let result = executor.execute(&self.cancel).await;
        match &result {
            Ok(()) => tracing::info!("run succeeded"),
            Err(e) => tracing::error!(error = %e, "run failed"),
        }
        result
    }

    /// Build the executor tree for `ids` without running it.
    ///
    /// Only a graph failure is returned here; an action that cannot be
    /// resolved becomes an always-failing node so the rest of the tree still
    /// builds.
    pub async fn build_executor(&self, ids: &[String]) -> Result<BoxExecutor, RunError> {
        let graph = self.graph_actions(ids)?;

        let workflow_name = self
            .workflows
            .workflow_for_event(&self.event_name)
            .map(|(name, _)| name)
            .unwrap_or_default();
        let context = RunContext::collect(
            &self.config,
            workflow_name,
            &self.event_name,
            &self.working_dir,
            self.backends.git.as_ref(),
        );

        let resolver = ActionResolver::new(
            &self.config,
            &self.working_dir,
            self.scratch.path(),
            &self.backends,
        );
        let assembler = RunAssembler::new(
            &self.config,
            &self.working_dir,
            self.scratch.path(),
            context,
            event_overlay(&self.event_payload)?,
            self.backends.engine.clone(),
            Arc::clone(&self.secrets),
        );

        let total = graph.len();
        let mut stages = Vec::with_capacity(total);
        for (index, members) in graph.stages().iter().enumerate() {
            let mut actions = Vec::with_capacity(members.len());
            for id in members {
                actions.push(self.action_executor(id, &resolver, &assembler).await);
            }

            let names = members.clone();
            let announce = FnExecutor::new(move |_| {
                let names = names.clone();
                async move {
                    tracing::info!(stage = index + 1, of = total, actions = ?names, "starting stage");
                    Ok(())
                }
            });
            let group = Concurrent::new(actions)
                .with_policy(self.config.stage_policy)
                .with_max_parallel(self.config.max_parallel);

            stages.push(BoxExecutor::new(Sequential::new(vec![
                BoxExecutor::new(announce),
                BoxExecutor::new(group),
            ])));
        }

        Ok(BoxExecutor::new(Sequential::new(stages)))
    }

    async fn action_executor(
        &self,
        id: &str,
        resolver: &ActionResolver,
        assembler: &RunAssembler,
    ) -> BoxExecutor {
        let span = tracing::info_span!("action", action = %id, dryrun = self.config.dryrun);

        let inner = match self.workflows.action(id) {
            None => BoxExecutor::failing(RunError::ActionNotFound(id.to_string())),
            Some(action) => match resolver.resolve(action).instrument(span.clone()).await {
                Err(e) => {
                    tracing::warn!(action = %id, error = %e, "action will fail when its stage runs");
                    BoxExecutor::failing(e)
                }
                Ok(resolved) => {
                    let mut steps: Vec<BoxExecutor> = resolved
                        .setup
                        .into_iter()
                        .map(|step| {
                            step.into_executor(
                                &self.backends.engine,
                                &self.backends.repositories,
                                self.config.dryrun,
                            )
                        })
                        .collect();
                    steps.push(assembler.run_executor(id, action, &resolved.image));
                    BoxExecutor::new(Sequential::new(steps))
                }
            },
        };

        BoxExecutor::new(Instrumented::new(inner, span))
    }

    /// Remove the scratch directory. Dropping the Runner does the same.
    pub fn close(self) -> Result<(), RunError> {
        let path = self.scratch.path().to_path_buf();
        self.scratch.close()?;
        tracing::debug!(scratch = %path.display(), "removed scratch directory");
        Ok(())
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// The only event the document declares, or `push`.
fn default_event(workflows: &WorkflowFile) -> String {
    let mut events = workflows.events();
    if events.len() == 1 {
        events.remove(0)
    } else {
        DEFAULT_EVENT.to_string()
    }
}
