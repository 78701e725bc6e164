//! Decoded workflow document.
//!
//! A document binds workflows (trigger event plus root actions) and defines
//! the actions they reach:
//!
//! ```json
//! {
//!   "workflow": { "ci": { "on": "push", "resolves": ["test"] } },
//!   "action": {
//!     "build": { "uses": "./action" },
//!     "test": { "needs": "build", "uses": "docker://alpine:3.20", "runs": "sh -c 'make test'" }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::command::parse_command;

/// The whole decoded document. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFile {
    #[serde(default, rename = "workflow")]
    pub workflows: BTreeMap<String, Workflow>,

    #[serde(default, rename = "action")]
    pub actions: BTreeMap<String, Action>,
}

/// A named binding from a trigger event to root actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub on: String,

    #[serde(default, deserialize_with = "one_or_many")]
    pub resolves: Vec<String>,
}

/// A single unit of work run in a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default, deserialize_with = "one_or_many")]
    pub needs: Vec<String>,

    pub uses: String,

    /// Overrides the image entrypoint.
    #[serde(default, deserialize_with = "command_line")]
    pub runs: Option<Vec<String>>,

    /// Overrides the image command.
    #[serde(default, deserialize_with = "command_line")]
    pub args: Option<Vec<String>>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub secrets: Vec<String>,
}

impl WorkflowFile {
    /// Every distinct trigger event, sorted.
    pub fn events(&self) -> Vec<String> {
        self.workflows
            .values()
            .map(|w| w.on.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The workflow bound to `event`. When several are, the first by name wins.
    pub fn workflow_for_event(&self, event: &str) -> Option<(&str, &Workflow)> {
        self.workflows
            .iter()
            .find(|(_, w)| w.on == event)
            .map(|(name, w)| (name.as_str(), w))
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

fn command_line<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Ok(None),
        Some(OneOrMany::Many(v)) => Ok(Some(v)),
        Some(OneOrMany::One(s)) => parse_command(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "workflow": {
            "ci": { "on": "push", "resolves": ["test", "lint"] },
            "release": { "on": "release", "resolves": "publish" }
        },
        "action": {
            "build": { "uses": "./action" },
            "test": {
                "needs": "build",
                "uses": "docker://alpine:3.20",
                "runs": "sh -c 'make test'",
                "env": { "CI": "1" },
                "secrets": ["TOKEN"]
            },
            "lint": { "needs": ["build"], "uses": "owner/lint@v2", "args": ["--strict"] },
            "publish": { "uses": "owner/publish" }
        }
    }"#;

    #[test]
    fn test_decode_document() {
        let file: WorkflowFile = serde_json::from_str(DOCUMENT).unwrap();
        assert_eq!(file.workflows.len(), 2);
        assert_eq!(file.workflows["release"].resolves, vec!["publish"]);

        let test = file.action("test").unwrap();
        assert_eq!(test.needs, vec!["build"]);
        assert_eq!(
            test.runs.as_deref(),
            Some(&["sh".to_string(), "-c".to_string(), "make test".to_string()][..])
        );
        assert_eq!(test.args, None);
        assert_eq!(test.env["CI"], "1");
        assert_eq!(test.secrets, vec!["TOKEN"]);

        let lint = file.action("lint").unwrap();
        assert_eq!(lint.args, Some(vec!["--strict".to_string()]));
        assert!(file.action("missing").is_none());
    }

    #[test]
    fn test_events_sorted_and_deduplicated() {
        let mut file: WorkflowFile = serde_json::from_str(DOCUMENT).unwrap();
        file.workflows.insert(
            "nightly".to_string(),
            Workflow {
                on: "push".to_string(),
                resolves: vec![],
            },
        );
        assert_eq!(file.events(), vec!["push", "release"]);
    }

    #[test]
    fn test_workflow_for_event() {
        let file: WorkflowFile = serde_json::from_str(DOCUMENT).unwrap();
        let (name, workflow) = file.workflow_for_event("push").unwrap();
        assert_eq!(name, "ci");
        assert_eq!(workflow.resolves, vec!["test", "lint"]);
        assert!(file.workflow_for_event("pull_request").is_none());
    }

    #[test]
    fn test_unclosed_quote_fails_decode() {
        let bad = r#"{ "action": { "a": { "uses": "./x", "runs": "echo 'nope" } } }"#;
        let err = serde_json::from_str::<WorkflowFile>(bad).unwrap_err();
        assert!(err.to_string().contains("unclosed quote"));
    }

    #[test]
    fn test_decode_yaml_document() {
        let yaml = r#"
workflow:
  main:
    on: push
    resolves: deploy
action:
  deploy:
    uses: docker://busybox
    args: echo "shipped it"
"#;
        let file: WorkflowFile = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(file.events(), vec!["push"]);
        assert_eq!(
            file.action("deploy").unwrap().args,
            Some(vec!["echo".to_string(), "shipped it".to_string()])
        );
    }
}
