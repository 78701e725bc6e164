//! Container invocation assembly: environment, mounts, naming.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stagehand_types::config::RunConfig;
use stagehand_types::container::{Bind, ContainerSpec, Overlay};
use stagehand_types::error::RunError;
use stagehand_types::workflow::Action;

use super::locator::sanitize_name;
use super::steps::RunContainer;
use crate::backend::{BoxContainerEngine, GitMetadata};
use crate::executor::BoxExecutor;
use crate::secret::SecretStore;

pub const WORKSPACE_DIR: &str = "/github/workspace";
pub const HOME_DIR: &str = "/github/home";
pub const EVENT_PATH: &str = "/github/workflow/event.json";

const CONTAINER_NAME_MAX: usize = 30;
const CONTAINER_DIGEST_LEN: usize = 8;

/// Values shared by every action of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    pub workflow: String,
    pub event: String,
    pub actor: String,
    pub sha: Option<String>,
    pub repository: Option<String>,
    pub branch: Option<String>,
}

impl RunContext {
    /// Gather run-wide values. Git lookups are best effort: a failure is
    /// logged and the corresponding variable is left out.
    pub fn collect(
        config: &RunConfig,
        workflow: &str,
        event: &str,
        working_dir: &Path,
        git: &dyn GitMetadata,
    ) -> Self {
        let sha = git
            .revision(working_dir)
            .inspect_err(|e| tracing::warn!(error = %e, "unable to determine git revision"))
            .ok();
        let repository = git
            .repository_slug(working_dir, &config.remote_name)
            .inspect_err(|e| tracing::warn!(error = %e, "unable to determine repository"))
            .ok();
        let branch = git
            .branch(working_dir)
            .inspect_err(|e| tracing::warn!(error = %e, "unable to determine branch"))
            .ok();

        Self {
            workflow: workflow.to_string(),
            event: event.to_string(),
            actor: config.actor.clone(),
            sha,
            repository,
            branch,
        }
    }

    fn variables(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::from([
            ("HOME".to_string(), HOME_DIR.to_string()),
            ("GITHUB_ACTOR".to_string(), self.actor.clone()),
            ("GITHUB_EVENT_PATH".to_string(), EVENT_PATH.to_string()),
            ("GITHUB_WORKSPACE".to_string(), WORKSPACE_DIR.to_string()),
            ("GITHUB_WORKFLOW".to_string(), self.workflow.clone()),
            ("GITHUB_EVENT_NAME".to_string(), self.event.clone()),
        ]);
        if let Some(sha) = &self.sha {
            vars.insert("GITHUB_SHA".to_string(), sha.clone());
        }
        if let Some(repository) = &self.repository {
            vars.insert("GITHUB_REPOSITORY".to_string(), repository.clone());
        }
        if let Some(branch) = &self.branch {
            vars.insert("GITHUB_REF".to_string(), format!("refs/heads/{branch}"));
        }
        vars
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// The layers of an action's environment, merged when the action runs.
///
/// Later layers win: literal `env`, then secrets, then run-wide values, then
/// `GITHUB_ACTION`.
#[derive(Debug, Clone)]
pub struct EnvironmentPlan {
    literal: BTreeMap<String, String>,
    secrets: Vec<String>,
    run_wide: BTreeMap<String, String>,
    action_id: String,
}

impl EnvironmentPlan {
    pub fn new(action_id: &str, action: &Action, context: &RunContext) -> Self {
        Self {
            literal: action.env.clone(),
            secrets: action.secrets.clone(),
            run_wide: context.variables(),
            action_id: action_id.to_string(),
        }
    }

    /// Merge every layer. Without a store, secrets are skipped entirely.
    pub async fn assemble(
        &self,
        secrets: Option<&SecretStore>,
    ) -> Result<BTreeMap<String, String>, RunError> {
        let mut env = self.literal.clone();

        match secrets {
            Some(store) => {
                for name in &self.secrets {
                    let value = store.resolve(name).await?;
                    env.insert(name.clone(), value);
                }
            }
            None if !self.secrets.is_empty() => {
                tracing::debug!(secrets = ?self.secrets, "secrets not resolved");
            }
            None => {}
        }

        env.extend(self.run_wide.clone());
        env.insert("GITHUB_ACTION".to_string(), self.action_id.clone());
        Ok(env)
    }
}

/// `<basename(working_dir)>-<action>` reduced to `[a-zA-Z0-9-]`, followed by
/// an 8 digit hex digest of the unsanitised pair. At most 30 characters, and
/// identical inputs always give the same name.
pub fn container_name(working_dir: &Path, action_id: &str) -> String {
    let base = working_dir
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let digest = fnv1a(format!("{}-{action_id}", working_dir.display()).as_bytes());
    let prefix = sanitize_name(
        &format!("{base}-{action_id}"),
        CONTAINER_NAME_MAX - CONTAINER_DIGEST_LEN - 1,
    );
    format!("{prefix}-{digest:08x}")
}

/// 32-bit FNV-1a. Stable across builds and platforms, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(0x0100_0193)
    })
}

// ---------------------------------------------------------------------------
// RunAssembler
// ---------------------------------------------------------------------------

/// Turns a resolved action into the executor that runs its container.
pub struct RunAssembler {
    working_dir: PathBuf,
    scratch_dir: PathBuf,
    engine_socket: PathBuf,
    context: RunContext,
    overlay: Overlay,
    engine: BoxContainerEngine,
    secrets: Arc<SecretStore>,
    dryrun: bool,
}

impl RunAssembler {
    pub fn new(
        config: &RunConfig,
        working_dir: &Path,
        scratch_dir: &Path,
        context: RunContext,
        overlay: Overlay,
        engine: BoxContainerEngine,
        secrets: Arc<SecretStore>,
    ) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
            scratch_dir: scratch_dir.to_path_buf(),
            engine_socket: config.engine_socket.clone(),
            context,
            overlay,
            engine,
            secrets,
            dryrun: config.dryrun,
        }
    }

    /// The invocation for `action`, with its environment still empty.
    pub fn container_spec(&self, action_id: &str, action: &Action, image: &str) -> ContainerSpec {
        let socket = self.engine_socket.to_string_lossy().into_owned();
        ContainerSpec {
            name: container_name(&self.working_dir, action_id),
            image: image.to_string(),
            entrypoint: action.runs.clone().unwrap_or_default(),
            cmd: action.args.clone().unwrap_or_default(),
            working_dir: WORKSPACE_DIR.to_string(),
            env: BTreeMap::new(),
            binds: vec![
                Bind::new(&self.working_dir, WORKSPACE_DIR),
                Bind::new(&self.scratch_dir, HOME_DIR),
                Bind::new(&self.engine_socket, socket),
            ],
            overlay: Some(self.overlay.clone()),
        }
    }

    pub fn run_executor(&self, action_id: &str, action: &Action, image: &str) -> BoxExecutor {
        BoxExecutor::new(RunContainer {
            engine: self.engine.clone(),
            spec: self.container_spec(action_id, action, image),
            environment: EnvironmentPlan::new(action_id, action, &self.context),
            secrets: Arc::clone(&self.secrets),
            dryrun: self.dryrun,
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::executor::Executor;
    use crate::secret::StaticSecrets;
    use crate::testing::{FakeEngine, FakeGit, NoPrompt};

    fn context() -> RunContext {
        RunContext {
            workflow: "ci".to_string(),
            event: "push".to_string(),
            actor: "octocat".to_string(),
            sha: Some("0123456789abcdef".to_string()),
            repository: Some("acme/widgets".to_string()),
            branch: Some("main".to_string()),
        }
    }

    fn store_with(pairs: &[(&str, &str)]) -> Arc<SecretStore> {
        let mut env = StaticSecrets::new("env");
        for (k, v) in pairs {
            env.insert(*k, *v);
        }
        Arc::new(SecretStore::new(vec![Arc::new(env)], Arc::new(NoPrompt)))
    }

    #[tokio::test]
    async fn test_secret_overrides_literal_env() {
        let action = Action {
            uses: "docker://alpine".to_string(),
            env: BTreeMap::from([("A".to_string(), "1".to_string())]),
            secrets: vec!["A".to_string()],
            ..Default::default()
        };
        let plan = EnvironmentPlan::new("build", &action, &context());
        let store = store_with(&[("A", "2")]);

        let env = plan.assemble(Some(store.as_ref())).await.unwrap();
        assert_eq!(env["A"], "2");
    }

    #[tokio::test]
    async fn test_run_wide_values_override_action_env() {
        let action = Action {
            uses: "docker://alpine".to_string(),
            env: BTreeMap::from([
                ("HOME".to_string(), "/root".to_string()),
                ("GITHUB_ACTION".to_string(), "spoofed".to_string()),
                ("KEEP".to_string(), "me".to_string()),
            ]),
            ..Default::default()
        };
        let env = EnvironmentPlan::new("build", &action, &context())
            .assemble(None)
            .await
            .unwrap();

        assert_eq!(env["HOME"], "/github/home");
        assert_eq!(env["GITHUB_ACTION"], "build");
        assert_eq!(env["KEEP"], "me");
        assert_eq!(env["GITHUB_ACTOR"], "octocat");
        assert_eq!(env["GITHUB_EVENT_PATH"], "/github/workflow/event.json");
        assert_eq!(env["GITHUB_WORKSPACE"], "/github/workspace");
        assert_eq!(env["GITHUB_WORKFLOW"], "ci");
        assert_eq!(env["GITHUB_EVENT_NAME"], "push");
        assert_eq!(env["GITHUB_SHA"], "0123456789abcdef");
        assert_eq!(env["GITHUB_REPOSITORY"], "acme/widgets");
        assert_eq!(env["GITHUB_REF"], "refs/heads/main");
    }

    #[tokio::test]
    async fn test_secrets_skipped_without_store() {
        let action = Action {
            uses: "docker://alpine".to_string(),
            secrets: vec!["TOKEN".to_string()],
            ..Default::default()
        };
        let env = EnvironmentPlan::new("a", &action, &context())
            .assemble(None)
            .await
            .unwrap();
        assert!(!env.contains_key("TOKEN"));
    }

    #[test]
    fn test_failed_git_lookups_omit_variables() {
        let config = RunConfig::default();
        let ctx = RunContext::collect(&config, "ci", "push", Path::new("/tmp"), &FakeGit::broken());
        assert_eq!(ctx.sha, None);

        let vars = ctx.variables();
        assert!(!vars.contains_key("GITHUB_SHA"));
        assert!(!vars.contains_key("GITHUB_REPOSITORY"));
        assert!(!vars.contains_key("GITHUB_REF"));
        assert_eq!(vars["GITHUB_ACTOR"], "nektos/act");
    }

    #[test]
    fn test_collect_uses_git_metadata() {
        let config = RunConfig::default();
        let git = FakeGit::new("abcdef0123456789", "develop", "acme/widgets");
        let ctx = RunContext::collect(&config, "ci", "push", Path::new("/tmp"), &git);
        assert_eq!(ctx.variables()["GITHUB_REF"], "refs/heads/develop");
        assert_eq!(ctx.variables()["GITHUB_SHA"], "abcdef0123456789");
    }

    #[test]
    fn test_container_name_is_sanitised_and_stable() {
        let dir = Path::new("/home/dev/myproject1234567890");
        let name = container_name(dir, "build!!");
        assert!(name.len() <= 30);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
        assert_eq!(name, container_name(dir, "build!!"));
        assert!(name.starts_with("myproject1234567890-"));
    }

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a(b""), 0x811c_9dc5);
        assert_eq!(fnv1a(b"a"), 0xe40c_292c);
    }

    #[test]
    fn test_container_names_differ_under_long_working_dir() {
        let dir = Path::new("/home/dev/my-organisation-monorepo-project");
        let build = container_name(dir, "build");
        let deploy = container_name(dir, "deploy");
        assert_ne!(build, deploy);
        assert_eq!(build.len(), 30);
        assert_eq!(deploy.len(), 30);
        assert!(build.starts_with("my-organisation-monor-"));
    }

    #[test]
    fn test_container_names_differ_by_punctuation_and_prefix() {
        let dir = Path::new("/work/widgets");
        assert_ne!(
            container_name(dir, "test.unit"),
            container_name(dir, "test-unit")
        );
        assert_ne!(
            container_name(dir, "integration-tests-for-the-api-v1"),
            container_name(dir, "integration-tests-for-the-api-v2")
        );
        assert_ne!(
            container_name(Path::new("/a/widgets"), "test"),
            container_name(Path::new("/b/widgets"), "test")
        );
    }

    fn assembler(engine: &FakeEngine, dryrun: bool) -> RunAssembler {
        let config = RunConfig {
            dryrun,
            ..Default::default()
        };
        RunAssembler::new(
            &config,
            Path::new("/work/widgets"),
            Path::new("/tmp/scratch"),
            context(),
            crate::action::overlay::event_overlay("{}").unwrap(),
            engine.boxed(),
            store_with(&[("TOKEN", "s3cret")]),
        )
    }

    #[test]
    fn test_container_spec_layout() {
        let engine = FakeEngine::default();
        let action = Action {
            uses: "docker://alpine".to_string(),
            runs: Some(vec!["sh".to_string()]),
            args: Some(vec!["-c".to_string(), "true".to_string()]),
            ..Default::default()
        };
        let spec = assembler(&engine, false).container_spec("test", &action, "alpine");

        assert_eq!(spec.name, container_name(Path::new("/work/widgets"), "test"));
        assert!(spec.name.starts_with("widgets-test-"));
        assert_eq!(spec.image, "alpine");
        assert_eq!(spec.entrypoint, vec!["sh"]);
        assert_eq!(spec.cmd, vec!["-c", "true"]);
        assert_eq!(spec.working_dir, "/github/workspace");
        let binds: Vec<String> = spec.binds.iter().map(ToString::to_string).collect();
        assert_eq!(
            binds,
            vec![
                "/work/widgets:/github/workspace",
                "/tmp/scratch:/github/home",
                "/var/run/docker.sock:/var/run/docker.sock",
            ]
        );
        assert_eq!(spec.overlay.unwrap().destination, "/github");
    }

    #[tokio::test]
    async fn test_run_executor_runs_container_with_env() {
        let engine = FakeEngine::default();
        let action = Action {
            uses: "docker://alpine".to_string(),
            secrets: vec!["TOKEN".to_string()],
            ..Default::default()
        };
        assembler(&engine, false)
            .run_executor("deploy", &action, "alpine")
            .execute(&CancellationToken::new())
            .await
            .unwrap();

        let runs = engine.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].env["TOKEN"], "s3cret");
        assert_eq!(runs[0].env["GITHUB_ACTION"], "deploy");
    }

    #[tokio::test]
    async fn test_run_executor_dryrun_skips_engine() {
        let engine = FakeEngine::default();
        let action = Action {
            uses: "docker://alpine".to_string(),
            ..Default::default()
        };
        assembler(&engine, true)
            .run_executor("deploy", &action, "alpine")
            .execute(&CancellationToken::new())
            .await
            .unwrap();
        assert!(engine.runs().is_empty());
    }

    #[tokio::test]
    async fn test_run_executor_reports_exit_failure() {
        let engine = FakeEngine::default()
            .failing_container(&container_name(Path::new("/work/widgets"), "deploy"), 2);
        let action = Action {
            uses: "docker://alpine".to_string(),
            ..Default::default()
        };
        let err = assembler(&engine, false)
            .run_executor("deploy", &action, "alpine")
            .execute(&CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "exit with `FAILURE`: 2");
    }
}
