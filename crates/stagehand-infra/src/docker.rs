//! Container engine adapter driving the `docker` command line tool.
//!
//! Any CLI-compatible engine (for example `podman`) works by changing the
//! program name. Environment values are written to a private `--env-file`
//! that is removed once the container exists, so secret values never appear
//! in an argument list and the CLI's own environment is left alone.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::process::{Output, Stdio};

use stagehand_core::backend::ContainerEngine;
use stagehand_types::container::ContainerSpec;
use stagehand_types::error::EngineError;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

/// Exit code a container uses to report a neutral outcome.
const NEUTRAL_EXIT_CODE: i32 = 78;

#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    reuse_containers: bool,
}

impl DockerCli {
    pub fn new(program: impl Into<String>, reuse_containers: bool) -> Self {
        Self {
            program: program.into(),
            reuse_containers,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.kill_on_drop(true);
        cmd
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }

    async fn output(&self, args: &[&str]) -> Result<Output, EngineError> {
        self.command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| EngineError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })
    }

    /// Run to completion, failing on a non-zero exit. Returns stdout.
    async fn check(&self, args: &[&str]) -> Result<String, EngineError> {
        let output = self.output(args).await?;
        if !output.status.success() {
            return Err(EngineError::CommandFailed {
                command: self.describe(args),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn container_exists(&self, name: &str) -> Result<bool, EngineError> {
        let filter = format!("name=^/{name}$");
        let listed = self
            .check(&["ps", "--all", "--quiet", "--filter", filter.as_str()])
            .await?;
        Ok(!listed.trim().is_empty())
    }

    async fn remove_container(&self, name: &str) -> Result<(), EngineError> {
        tracing::debug!(container = %name, "removing container");
        self.check(&["rm", "--force", "--volumes", name]).await?;
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<(), EngineError> {
        let env_file = if spec.env.is_empty() {
            None
        } else {
            Some(write_env_file(&spec.env)?)
        };
        let args = create_args(spec, env_file.as_ref().map(NamedTempFile::path));
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        tracing::debug!(container = %spec.name, image = %spec.image, "creating container");

        let output = self.output(&arg_refs).await?;
        drop(env_file);
        if !output.status.success() {
            return Err(EngineError::CommandFailed {
                command: format!("{} create {}", self.program, spec.name),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    async fn copy_overlay(&self, spec: &ContainerSpec) -> Result<(), EngineError> {
        let Some(overlay) = &spec.overlay else {
            return Ok(());
        };
        let target = format!("{}:{}", spec.name, overlay.destination);
        let spawn_error = |e: std::io::Error| EngineError::Spawn {
            program: self.program.clone(),
            reason: e.to_string(),
        };

        let mut child = self
            .command()
            .args(["cp", "-", target.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&overlay.archive).await.map_err(spawn_error)?;
        }
        let output = child.wait_with_output().await.map_err(spawn_error)?;
        if !output.status.success() {
            return Err(EngineError::CommandFailed {
                command: format!("{} cp - {target}", self.program),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Start the container attached, forwarding its output to the log, and
    /// return its exit code.
    async fn start_attached(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<i32, EngineError> {
        let spawn_error = |e: std::io::Error| EngineError::Spawn {
            program: self.program.clone(),
            reason: e.to_string(),
        };
        let mut child = self
            .command()
            .args(["start", "--attach", name])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let finished = tokio::select! {
            status = async {
                tokio::join!(forward_lines(stdout, "stdout"), forward_lines(stderr, "stderr"));
                child.wait().await
            } => Some(status),
            _ = cancel.cancelled() => None,
        };

        let Some(status) = finished else {
            tracing::warn!(container = %name, "cancelled, killing container");
            let _ = child.start_kill();
            if let Err(e) = self.check(&["kill", name]).await {
                tracing::debug!(container = %name, error = %e, "kill failed");
            }
            return Err(EngineError::Terminated(name.to_string()));
        };
        let status = status.map_err(spawn_error)?;

        let inspected = self
            .check(&["inspect", "--format", "{{.State.ExitCode}}", name])
            .await
            .ok()
            .and_then(|code| code.trim().parse::<i32>().ok());
        match inspected.or(status.code()) {
            Some(code) => Ok(code),
            None => Err(EngineError::Terminated(name.to_string())),
        }
    }
}

impl ContainerEngine for DockerCli {
    async fn image_exists(&self, image: &str) -> Result<bool, EngineError> {
        let output = self
            .output(&["image", "inspect", "--format", "{{.Id}}", image])
            .await?;
        Ok(output.status.success())
    }

    async fn pull(&self, image: &str) -> Result<(), EngineError> {
        tracing::debug!(image = %image, "docker pull");
        self.check(&["pull", "--quiet", image]).await?;
        Ok(())
    }

    async fn build(&self, context_dir: &Path, tag: &str) -> Result<(), EngineError> {
        let context = context_dir.to_string_lossy();
        tracing::debug!(tag = %tag, context = %context, "docker build");
        let output = self.check(&["build", "--tag", tag, context.as_ref()]).await?;
        for line in output.lines() {
            tracing::debug!(tag = %tag, "{line}");
        }
        Ok(())
    }

    async fn run(&self, spec: &ContainerSpec, cancel: &CancellationToken) -> Result<(), EngineError> {
        let exists = self.container_exists(&spec.name).await?;
        if exists && !self.reuse_containers {
            self.remove_container(&spec.name).await?;
        }
        if !exists || !self.reuse_containers {
            self.create_container(spec).await?;
            self.copy_overlay(spec).await?;
        }

        let code = self.start_attached(&spec.name, cancel).await;

        if !self.reuse_containers {
            if let Err(e) = self.remove_container(&spec.name).await {
                tracing::warn!(container = %spec.name, error = %e, "unable to remove container");
            }
        }

        exit_result(&spec.name, code?)
    }
}

/// Map a container exit code to an outcome.
pub fn exit_result(container: &str, code: i32) -> Result<(), EngineError> {
    match code {
        0 => Ok(()),
        NEUTRAL_EXIT_CODE => Err(EngineError::Neutral {
            container: container.to_string(),
        }),
        code => Err(EngineError::ExitStatus {
            container: container.to_string(),
            code,
        }),
    }
}

/// Arguments for `docker create`. The first entrypoint token becomes
/// `--entrypoint`; the remaining tokens are placed ahead of the command.
pub fn create_args(spec: &ContainerSpec, env_file: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "--name".to_string(),
        spec.name.clone(),
        "--workdir".to_string(),
        spec.working_dir.clone(),
    ];
    if let Some(path) = env_file {
        args.push("--env-file".to_string());
        args.push(path.to_string_lossy().into_owned());
    }
    for bind in &spec.binds {
        args.push("--volume".to_string());
        args.push(bind.to_string());
    }

    let mut entrypoint = spec.entrypoint.iter();
    if let Some(first) = entrypoint.next() {
        args.push("--entrypoint".to_string());
        args.push(first.clone());
    }
    args.push(spec.image.clone());
    args.extend(entrypoint.cloned());
    args.extend(spec.cmd.iter().cloned());
    args
}

/// Write `KEY=VALUE` lines to a temporary file readable only by the owner.
/// The file is deleted when the handle drops.
fn write_env_file(env: &BTreeMap<String, String>) -> Result<NamedTempFile, EngineError> {
    let io_error = |e: std::io::Error| EngineError::Spawn {
        program: "env-file".to_string(),
        reason: e.to_string(),
    };
    let mut file = tempfile::Builder::new()
        .prefix("stagehand-env-")
        .tempfile()
        .map_err(io_error)?;
    for (key, value) in env {
        if value.contains(['\n', '\r']) {
            return Err(EngineError::MultilineEnv(key.clone()));
        }
        writeln!(file, "{key}={value}").map_err(io_error)?;
    }
    file.flush().map_err(io_error)?;
    Ok(file)
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: Option<R>, stream: &'static str) {
    let Some(reader) = reader else { return };
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::info!(stream, "{line}");
    }
}
