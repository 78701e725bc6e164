//! Running a workflow, with Ctrl-C wired to cancellation.

use anyhow::Result;
use console::style;
use stagehand_core::runner::Runner;
use tracing::Instrument;
use uuid::Uuid;

pub async fn run(runner: &Runner, actions: &[String], json: bool) -> Result<()> {
    let run_id = Uuid::now_v7();
    let cancel = runner.cancel_token();

    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling run");
                cancel.cancel();
            }
        }
    });

    let span = tracing::info_span!("run", %run_id, dryrun = runner.config().dryrun);
    let result = async {
        if actions.is_empty() {
            runner.run_event().await
        } else {
            runner.run_actions(actions).await
        }
    }
    .instrument(span)
    .await;
    watcher.abort();

    let succeeded = result.is_ok();
    if json {
        let summary = serde_json::json!({
            "run_id": run_id.to_string(),
            "event": runner.event_name(),
            "actions": actions,
            "dryrun": runner.config().dryrun,
            "succeeded": succeeded,
            "error": result.as_ref().err().map(ToString::to_string),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if succeeded {
        eprintln!("  {} Run complete", style("✓").green().bold());
    }

    result.map_err(Into::into)
}
