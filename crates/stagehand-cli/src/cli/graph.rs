//! `--graph`: the stages a run would execute.

use anyhow::Result;
use console::style;
use serde::Serialize;
use stagehand_core::graph::ExecutionGraph;
use stagehand_core::runner::Runner;

#[derive(Debug, Serialize)]
struct GraphOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<&'a str>,
    stages: &'a ExecutionGraph,
}

/// Stages for `actions`, or for the configured event when none are given.
pub fn show_graph(runner: &Runner, actions: &[String], json: bool) -> Result<()> {
    let (event, graph) = if actions.is_empty() {
        let event = runner.event_name();
        (Some(event), runner.graph_event(event)?)
    } else {
        (None, runner.graph_actions(actions)?)
    };

    if json {
        let output = GraphOutput {
            event,
            stages: &graph,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    match event {
        Some(event) => println!("  Event {}", style(event).cyan().bold()),
        None => println!("  Actions {}", style(actions.join(", ")).cyan().bold()),
    }
    for (index, stage) in graph.stages().iter().enumerate() {
        let arrow = if index == 0 { " " } else { "↓" };
        println!("  {}", style(arrow).dim());
        println!(
            "  {} {}",
            style(format!("stage {}", index + 1)).bold(),
            stage
                .iter()
                .map(|id| style(id).green().to_string())
                .collect::<Vec<_>>()
                .join("  ")
        );
    }
    println!();
    Ok(())
}
