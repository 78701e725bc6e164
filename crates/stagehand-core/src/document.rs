//! Loading the workflow document and the event payload from disk.

use std::path::Path;

use stagehand_types::error::RunError;
use stagehand_types::workflow::WorkflowFile;

/// Serialisation of a workflow document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// `.yml` and `.yaml` are YAML; anything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yml" | "yaml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

pub fn parse_workflow_document(
    text: &str,
    format: DocumentFormat,
) -> Result<WorkflowFile, RunError> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str(text).map_err(|e| RunError::load("workflow document", e))
        }
        DocumentFormat::Yaml => {
            serde_yaml_ng::from_str(text).map_err(|e| RunError::load("workflow document", e))
        }
    }
}

pub async fn load_workflow_file(path: &Path) -> Result<WorkflowFile, RunError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RunError::load(format!("workflow file {}", path.display()), e))?;
    let file = parse_workflow_document(&text, DocumentFormat::from_path(path))?;
    tracing::debug!(
        path = %path.display(),
        workflows = file.workflows.len(),
        actions = file.actions.len(),
        "loaded workflow document"
    );
    Ok(file)
}

/// Read an event payload, which must be valid JSON.
pub async fn load_event_payload(path: &Path) -> Result<String, RunError> {
    let what = format!("event payload {}", path.display());
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RunError::load(what.clone(), e))?;
    serde_json::from_str::<serde_json::Value>(&text).map_err(|e| RunError::load(what, e))?;
    Ok(text)
}
