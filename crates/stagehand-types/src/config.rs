//! Run configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How a stage reacts when one of its actions fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePolicy {
    /// Let every sibling finish, then report the first failure.
    #[default]
    RunToCompletion,
    /// Signal cancellation to the remaining siblings after the first failure.
    CancelSiblings,
}

/// Everything a Runner needs to know about one run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory mounted as the workspace; relative paths resolve against it.
    pub working_dir: PathBuf,

    /// Workflow document, relative to `working_dir` unless absolute.
    pub workflow_path: PathBuf,

    /// Event to run. `None` picks the only declared event, or `push`.
    pub event_name: Option<String>,

    /// Event payload JSON, relative to `working_dir` unless absolute.
    pub event_path: Option<PathBuf>,

    pub dryrun: bool,
    pub force_pull: bool,
    pub reuse_containers: bool,

    /// Value of `GITHUB_ACTOR` inside containers.
    pub actor: String,

    pub stage_policy: StagePolicy,

    /// Upper bound on actions running at once within a stage.
    pub max_parallel: Option<usize>,

    /// Treat a `needs` entry naming an undefined action as an error.
    pub strict_needs: bool,

    /// Ref used for remote actions that do not pin one.
    pub default_branch: String,

    /// Host serving remote action repositories.
    pub repository_host: String,

    /// Git remote used to derive `GITHUB_REPOSITORY`.
    pub remote_name: String,

    /// Engine control socket, bind-mounted into every container.
    pub engine_socket: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            workflow_path: PathBuf::from(".github/main.workflow.json"),
            event_name: None,
            event_path: None,
            dryrun: false,
            force_pull: false,
            reuse_containers: false,
            actor: "nektos/act".to_string(),
            stage_policy: StagePolicy::default(),
            max_parallel: None,
            strict_needs: false,
            default_branch: "master".to_string(),
            repository_host: "github.com".to_string(),
            remote_name: "origin".to_string(),
            engine_socket: PathBuf::from("/var/run/docker.sock"),
        }
    }
}

/// Optional settings read from configuration files.
///
/// Every field is optional; present values override [`RunConfig`] defaults and
/// are themselves overridden by command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub workflow: Option<PathBuf>,
    pub event_path: Option<PathBuf>,
    pub actor: Option<String>,
    pub force_pull: Option<bool>,
    pub reuse_containers: Option<bool>,
    pub stage_policy: Option<StagePolicy>,
    pub max_parallel: Option<usize>,
    pub strict_needs: Option<bool>,
    pub default_branch: Option<String>,
    pub repository_host: Option<String>,
    pub remote_name: Option<String>,
    pub engine_socket: Option<PathBuf>,
    /// Container engine command line tool, `docker` by default.
    pub engine_program: Option<String>,
    /// `NAME=VALUE` secrets file, relative to the working directory.
    pub secret_file: Option<PathBuf>,
}

impl FileConfig {
    /// Layer `other` on top of `self`: fields set in `other` win.
    pub fn merge(self, other: FileConfig) -> FileConfig {
        FileConfig {
            workflow: other.workflow.or(self.workflow),
            event_path: other.event_path.or(self.event_path),
            actor: other.actor.or(self.actor),
            force_pull: other.force_pull.or(self.force_pull),
            reuse_containers: other.reuse_containers.or(self.reuse_containers),
            stage_policy: other.stage_policy.or(self.stage_policy),
            max_parallel: other.max_parallel.or(self.max_parallel),
            strict_needs: other.strict_needs.or(self.strict_needs),
            default_branch: other.default_branch.or(self.default_branch),
            repository_host: other.repository_host.or(self.repository_host),
            remote_name: other.remote_name.or(self.remote_name),
            engine_socket: other.engine_socket.or(self.engine_socket),
            engine_program: other.engine_program.or(self.engine_program),
            secret_file: other.secret_file.or(self.secret_file),
        }
    }

    /// Write every present value into `config`.
    pub fn apply_to(&self, config: &mut RunConfig) {
        if let Some(workflow) = &self.workflow {
            config.workflow_path = workflow.clone();
        }
        if let Some(event_path) = &self.event_path {
            config.event_path = Some(event_path.clone());
        }
        if let Some(actor) = &self.actor {
            config.actor = actor.clone();
        }
        if let Some(force_pull) = self.force_pull {
            config.force_pull = force_pull;
        }
        if let Some(reuse) = self.reuse_containers {
            config.reuse_containers = reuse;
        }
        if let Some(policy) = self.stage_policy {
            config.stage_policy = policy;
        }
        if self.max_parallel.is_some() {
            config.max_parallel = self.max_parallel;
        }
        if let Some(strict) = self.strict_needs {
            config.strict_needs = strict;
        }
        if let Some(branch) = &self.default_branch {
            config.default_branch = branch.clone();
        }
        if let Some(host) = &self.repository_host {
            config.repository_host = host.clone();
        }
        if let Some(remote) = &self.remote_name {
            config.remote_name = remote.clone();
        }
        if let Some(socket) = &self.engine_socket {
            config.engine_socket = socket.clone();
        }
    }
}
