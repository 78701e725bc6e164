//! stagehand entry point.
//!
//! Binary name: `stagehand`
//!
//! Parses flags, layers configuration, wires the infrastructure adapters into
//! a Runner and dispatches to list, graph or run.

mod cli;

use std::sync::Arc;

use clap::Parser;
use clap_complete::generate;
use stagehand_core::backend::{Backends, BoxContainerEngine, BoxRepositoryHost};
use stagehand_core::runner::Runner;
use stagehand_infra::config::load_layered_config;
use stagehand_infra::docker::DockerCli;
use stagehand_infra::git::FsGitMetadata;
use stagehand_infra::repository::GitRepositoryHost;
use stagehand_infra::secret::{TerminalPrompt, build_secret_sources, load_secret_file};
use stagehand_observe::{LogOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};

const DEFAULT_ENGINE_PROGRAM: &str = "docker";
const GIT_PROGRAM: &str = "git";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "stagehand", &mut std::io::stdout());
        return Ok(());
    }

    let log_options = LogOptions::new(cli.log_filter())
        .json(cli.json)
        .otel(cli.otel);
    init_tracing(&log_options).map_err(|e| anyhow::anyhow!("unable to initialise logging: {e}"))?;

    let result = dispatch(&cli).await;
    shutdown_tracing();
    result
}

async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    let file_config = load_layered_config(&cli.directory).await;
    let config = cli.run_config(&file_config);

    let prompt = Arc::new(TerminalPrompt::new());
    let command_line = cli::secrets::invocation_secrets(cli, prompt.as_ref())?;
    let secret_file = load_secret_file(&cli.secret_file(&file_config)).await?;

    let engine_program = file_config
        .engine_program
        .clone()
        .unwrap_or_else(|| DEFAULT_ENGINE_PROGRAM.to_string());
    let backends = Backends {
        engine: BoxContainerEngine::new(DockerCli::new(engine_program, config.reuse_containers)),
        repositories: BoxRepositoryHost::new(GitRepositoryHost::new(GIT_PROGRAM)),
        git: Arc::new(FsGitMetadata::new()),
        secret_sources: build_secret_sources(command_line, Some(secret_file)),
        prompt,
    };

    let runner = Runner::new(config, backends).await?;

    let result = if cli.list {
        cli::list::list_events(&runner, cli.json)
    } else if cli.graph {
        cli::graph::show_graph(&runner, &cli.actions, cli.json)
    } else {
        cli::run::run(&runner, &cli.actions, cli.json).await
    };

    if let Err(e) = runner.close() {
        tracing::warn!(error = %e, "unable to remove scratch directory");
    }
    result
}
