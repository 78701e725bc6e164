//! CLI definitions for the `stagehand` binary.
//!
//! The bare command runs a workflow; `--list` and `--graph` inspect the
//! document instead. Shell completions are the only subcommand.

pub mod graph;
pub mod list;
pub mod run;
pub mod secrets;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use stagehand_types::config::{FileConfig, RunConfig, StagePolicy};

/// Run container workflows locally.
#[derive(Parser)]
#[command(name = "stagehand", version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Event to run. Defaults to the document's only event, or `push`.
    pub event: Option<String>,

    /// List the events the workflow document responds to.
    #[arg(short, long)]
    pub list: bool,

    /// Print the stages that would run instead of running them.
    #[arg(short, long)]
    pub graph: bool,

    /// Run these actions (and what they need) instead of an event's workflow.
    #[arg(short, long = "action", value_name = "ID")]
    pub actions: Vec<String>,

    /// Working directory.
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
    pub directory: PathBuf,

    /// Workflow document, relative to the working directory.
    #[arg(short = 'W', long, value_name = "FILE")]
    pub workflow: Option<PathBuf>,

    /// JSON event payload made available to actions.
    #[arg(short = 'e', long = "event-path", value_name = "EVENT_PATH")]
    pub event_path: Option<PathBuf>,

    /// Log what would happen without touching the container engine.
    #[arg(short = 'n', long)]
    pub dryrun: bool,

    /// Pull images even when they exist locally.
    #[arg(short, long)]
    pub pull: bool,

    /// Keep containers between runs instead of recreating them.
    #[arg(short, long)]
    pub reuse: bool,

    /// Secret for actions: `NAME=VALUE`, or `NAME` to read it from the
    /// environment or prompt for it.
    #[arg(short, long = "secret", value_name = "NAME[=VALUE]")]
    pub secrets: Vec<String>,

    /// `NAME=VALUE` secrets file, relative to the working directory.
    #[arg(long, value_name = "FILE", env = "STAGEHAND_SECRET_FILE")]
    pub secret_file: Option<PathBuf>,

    /// User reported as the triggering actor.
    #[arg(long, value_name = "NAME")]
    pub actor: Option<String>,

    /// Cancel the rest of a stage as soon as one action fails.
    #[arg(long)]
    pub fail_fast: bool,

    /// Upper bound on concurrently running actions per stage.
    #[arg(long, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Treat a dependency on an undefined action as an error.
    #[arg(long)]
    pub strict_needs: bool,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, hide = true)]
    pub otel: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Cli {
    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,stagehand=debug",
            _ => "trace",
        }
    }

    /// Defaults, then configuration files, then flags.
    pub fn run_config(&self, file: &FileConfig) -> RunConfig {
        let mut config = RunConfig {
            working_dir: self.directory.clone(),
            ..RunConfig::default()
        };
        file.apply_to(&mut config);

        if let Some(workflow) = &self.workflow {
            config.workflow_path = workflow.clone();
        }
        if let Some(event_path) = &self.event_path {
            config.event_path = Some(event_path.clone());
        }
        if let Some(actor) = &self.actor {
            config.actor = actor.clone();
        }
        config.event_name = self.event.clone();
        config.dryrun = self.dryrun;
        config.force_pull |= self.pull;
        config.reuse_containers |= self.reuse;
        config.strict_needs |= self.strict_needs;
        if self.fail_fast {
            config.stage_policy = StagePolicy::CancelSiblings;
        }
        if self.max_parallel.is_some() {
            config.max_parallel = self.max_parallel;
        }
        config
    }

    /// `false` for `--list` and `--graph`, which only inspect the document.
    pub fn runs_workflow(&self) -> bool {
        !self.list && !self.graph
    }

    /// Secrets file from the flag, the configuration files, or `.secrets`.
    pub fn secret_file(&self, file: &FileConfig) -> PathBuf {
        let path = self
            .secret_file
            .clone()
            .or_else(|| file.secret_file.clone())
            .unwrap_or_else(|| PathBuf::from(".secrets"));
        if path.is_absolute() {
            path
        } else {
            self.directory.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_maps_to_filter() {
        let quiet = Cli::parse_from(["stagehand", "-q"]);
        assert_eq!(quiet.log_filter(), "error");
        let default = Cli::parse_from(["stagehand"]);
        assert_eq!(default.log_filter(), "warn");
        let verbose = Cli::parse_from(["stagehand", "-v"]);
        assert_eq!(verbose.log_filter(), "info,stagehand=debug");
        let trace = Cli::parse_from(["stagehand", "-vv"]);
        assert_eq!(trace.log_filter(), "trace");
    }

    #[test]
    fn flags_override_config_files() {
        let cli = Cli::parse_from([
            "stagehand",
            "pull_request",
            "-C",
            "/work",
            "-W",
            "flows.yaml",
            "-n",
            "--pull",
            "--fail-fast",
            "--max-parallel",
            "2",
            "--actor",
            "octocat",
        ]);
        let file = FileConfig {
            actor: Some("from-file".into()),
            max_parallel: Some(8),
            reuse_containers: Some(true),
            ..FileConfig::default()
        };

        let config = cli.run_config(&file);
        assert_eq!(config.working_dir, PathBuf::from("/work"));
        assert_eq!(config.workflow_path, PathBuf::from("flows.yaml"));
        assert_eq!(config.event_name.as_deref(), Some("pull_request"));
        assert_eq!(config.actor, "octocat");
        assert_eq!(config.max_parallel, Some(2));
        assert_eq!(config.stage_policy, StagePolicy::CancelSiblings);
        assert!(config.dryrun);
        assert!(config.force_pull);
        assert!(config.reuse_containers, "file value survives an unset flag");
    }

    #[test]
    fn repeated_actions_and_secrets() {
        let cli = Cli::parse_from([
            "stagehand", "-a", "build", "-a", "test", "-s", "TOKEN=x", "-s", "OTHER",
        ]);
        assert_eq!(cli.actions, vec!["build", "test"]);
        assert_eq!(cli.secrets, vec!["TOKEN=x", "OTHER"]);
        assert!(cli.event.is_none());
    }

    #[test]
    fn only_the_bare_command_runs_a_workflow() {
        assert!(Cli::parse_from(["stagehand", "push"]).runs_workflow());
        assert!(!Cli::parse_from(["stagehand", "--list"]).runs_workflow());
        assert!(!Cli::parse_from(["stagehand", "-g", "-a", "build"]).runs_workflow());
    }

    #[test]
    fn completions_subcommand() {
        let cli = Cli::parse_from(["stagehand", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Completions { shell: Shell::Bash })
        ));
    }

    #[test]
    fn secret_file_resolution() {
        let cli = Cli::parse_from(["stagehand", "-C", "/work"]);
        assert_eq!(
            cli.secret_file(&FileConfig::default()),
            PathBuf::from("/work/.secrets")
        );
        let file = FileConfig {
            secret_file: Some("/etc/stagehand/secrets".into()),
            ..FileConfig::default()
        };
        assert_eq!(cli.secret_file(&file), PathBuf::from("/etc/stagehand/secrets"));
    }
}
