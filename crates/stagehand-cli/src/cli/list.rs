//! `--list`: events in the workflow document.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde::Serialize;
use stagehand_core::runner::Runner;

#[derive(Debug, Serialize)]
pub struct EventSummary {
    pub event: String,
    pub workflow: String,
    pub actions: Vec<String>,
    /// `None` when the workflow's graph cannot be built.
    pub stages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn summarize(runner: &Runner) -> Vec<EventSummary> {
    runner
        .list_events()
        .into_iter()
        .map(|event| {
            let (workflow, actions) = runner
                .workflows()
                .workflow_for_event(&event)
                .map(|(name, w)| (name.to_string(), w.resolves.clone()))
                .unwrap_or_default();
            let (stages, error) = match runner.graph_event(&event) {
                Ok(graph) => (Some(graph.len()), None),
                Err(e) => (None, Some(e.to_string())),
            };
            EventSummary {
                event,
                workflow,
                actions,
                stages,
                error,
            }
        })
        .collect()
}

pub fn list_events(runner: &Runner, json: bool) -> Result<()> {
    let events = summarize(runner);

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!();
        println!(
            "  {} No workflows in {}",
            style("i").blue().bold(),
            style(runner.config().workflow_path.display()).yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Event").fg(Color::White),
        Cell::new("Workflow").fg(Color::White),
        Cell::new("Resolves").fg(Color::White),
        Cell::new("Stages").fg(Color::White),
    ]);

    for summary in &events {
        let stages = match (&summary.stages, &summary.error) {
            (Some(n), _) => Cell::new(n),
            (None, Some(e)) => Cell::new(e).fg(Color::Red),
            (None, None) => Cell::new("-"),
        };
        table.add_row(vec![
            Cell::new(&summary.event).fg(Color::Cyan),
            Cell::new(&summary.workflow),
            Cell::new(summary.actions.join(", ")).fg(Color::DarkGrey),
            stages,
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
