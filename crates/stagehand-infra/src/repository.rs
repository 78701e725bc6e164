//! Remote action repositories over HTTPS and the `git` command line tool.

use std::path::Path;
use std::time::Duration;

use stagehand_core::backend::RepositoryHost;
use stagehand_types::error::EngineError;
use tokio::process::Command;
use tokio::sync::Mutex;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GitRepositoryHost {
    client: reqwest::Client,
    program: String,
    /// One clone or fetch at a time across the whole run.
    checkout_lock: Mutex<()>,
}

impl GitRepositoryHost {
    pub fn new(program: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .user_agent(concat!("stagehand/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            program: program.into(),
            checkout_lock: Mutex::new(()),
        }
    }

    async fn git(&self, dir: Option<&Path>, args: &[&str]) -> Result<std::process::Output, String> {
        let mut cmd = Command::new(&self.program);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to spawn {}: {e}", self.program))
    }

    async fn git_checked(&self, dir: Option<&Path>, args: &[&str]) -> Result<(), String> {
        let output = self.git(dir, args).await?;
        if output.status.success() {
            return Ok(());
        }
        Err(format!(
            "{} {} failed: {}",
            self.program,
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }

    async fn sync(&self, url: &str, git_ref: &str, dir: &Path) -> Result<(), String> {
        if dir.join(".git").is_dir() {
            tracing::debug!(dir = %dir.display(), "fetching existing checkout");
            self.git_checked(Some(dir), &["fetch", "--tags", "--force", "origin"])
                .await?;
        } else {
            if let Some(parent) = dir.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| format!("unable to create {}: {e}", parent.display()))?;
            }
            let target = dir.to_string_lossy();
            tracing::debug!(%url, dir = %target, "cloning");
            self.git_checked(None, &["clone", "--quiet", url, target.as_ref()])
                .await?;
        }

        // Branch names move; prefer the freshly fetched remote-tracking ref.
        let remote_ref = format!("refs/remotes/origin/{git_ref}");
        let is_branch = self
            .git(Some(dir), &["rev-parse", "--verify", "--quiet", remote_ref.as_str()])
            .await?
            .status
            .success();
        let target = if is_branch {
            format!("origin/{git_ref}")
        } else {
            git_ref.to_string()
        };

        self.git_checked(
            Some(dir),
            &["checkout", "--quiet", "--force", "--detach", target.as_str()],
        )
        .await
    }
}

impl RepositoryHost for GitRepositoryHost {
    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => {
                tracing::debug!(%url, status = %response.status(), "probed repository");
                response.status().as_u16() < 400
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "repository probe failed");
                false
            }
        }
    }

    async fn checkout(&self, url: &str, git_ref: &str, dir: &Path) -> Result<(), EngineError> {
        let _guard = self.checkout_lock.lock().await;
        tracing::info!(%url, %git_ref, "git clone");

        self.sync(url, git_ref, dir)
            .await
            .map_err(|reason| EngineError::Checkout {
                url: url.to_string(),
                git_ref: git_ref.to_string(),
                reason,
            })?;

        tracing::debug!(%url, %git_ref, dir = %dir.display(), "checked out");
        Ok(())
    }
}
