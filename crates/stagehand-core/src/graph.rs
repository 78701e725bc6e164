//! Dependency graph builder.
//!
//! Turns a set of requested actions into ordered stages: every action lands in
//! the first stage after all of its `needs`, and actions sharing a stage can
//! run concurrently.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use serde::Serialize;
use stagehand_types::error::GraphError;
use stagehand_types::workflow::Action;

/// Ordered stages of action identifiers. Members of a stage are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecutionGraph {
    stages: Vec<Vec<String>>,
}

impl ExecutionGraph {
    pub fn stages(&self) -> &[Vec<String>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Index of the stage holding `id`.
    pub fn stage_of(&self, id: &str) -> Option<usize> {
        self.stages
            .iter()
            .position(|stage| stage.iter().any(|member| member == id))
    }
}

// ---------------------------------------------------------------------------
// Stage computation
// ---------------------------------------------------------------------------

/// Build the execution graph for `roots`.
///
/// 1. Walk `needs` transitively from the roots. An identifier `lookup` does
///    not know is a leaf, unless `strict` is set, in which case it is an error.
/// 2. Peel off stages: each stage takes every remaining action whose needs are
///    all placed already. A round that places nothing means the remaining
///    actions can never run.
pub fn build_execution_graph<'a, F>(
    roots: &[String],
    lookup: F,
    strict: bool,
) -> Result<ExecutionGraph, GraphError>
where
    F: Fn(&str) -> Option<&'a Action>,
{
    let mut pending = collect_needs(roots, lookup, strict)?;
    let mut placed: HashSet<String> = HashSet::with_capacity(pending.len());
    let mut stages = Vec::new();

    while !pending.is_empty() {
        let ready: Vec<String> = pending
            .iter()
            .filter(|(_, needs)| needs.iter().all(|need| placed.contains(need)))
            .map(|(id, _)| id.clone())
            .collect();

        if ready.is_empty() {
            return Err(GraphError::Unresolvable {
                stuck: pending.keys().cloned().collect(),
                cycle: find_cycle(&pending),
            });
        }

        for id in &ready {
            pending.remove(id);
            placed.insert(id.clone());
        }
        stages.push(ready);
    }

    tracing::debug!(stages = stages.len(), actions = placed.len(), "built execution graph");
    Ok(ExecutionGraph { stages })
}

fn collect_needs<'a, F>(
    roots: &[String],
    lookup: F,
    strict: bool,
) -> Result<BTreeMap<String, Vec<String>>, GraphError>
where
    F: Fn(&str) -> Option<&'a Action>,
{
    let mut needs: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut worklist: VecDeque<String> = roots.iter().cloned().collect();

    while let Some(id) = worklist.pop_front() {
        if needs.contains_key(&id) {
            continue;
        }
        let deps = match lookup(&id) {
            Some(action) => action.needs.clone(),
            None if strict => return Err(GraphError::UnknownAction(id)),
            None => {
                tracing::debug!(action = %id, "action not defined, treating it as a leaf");
                Vec::new()
            }
        };
        worklist.extend(deps.iter().filter(|d| !needs.contains_key(*d)).cloned());
        needs.insert(id, deps);
    }

    Ok(needs)
}

/// Members of the first dependency cycle among `pending`, sorted.
///
/// Empty when the stuck actions are only waiting on a cycle elsewhere.
fn find_cycle(pending: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let mut graph = DiGraph::<&str, ()>::new();
    let nodes: HashMap<&str, _> = pending
        .keys()
        .map(|id| (id.as_str(), graph.add_node(id.as_str())))
        .collect();

    for (id, needs) in pending {
        for need in needs {
            if let Some(&from) = nodes.get(need.as_str()) {
                graph.add_edge(from, nodes[id.as_str()], ());
            }
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .find(|component| {
            component.len() > 1
                || graph.contains_edge(component[0], component[0])
        })
        .map(|component| {
            let mut members: Vec<String> =
                component.iter().map(|idx| graph[*idx].to_string()).collect();
            members.sort();
            members
        })
        .unwrap_or_default()
}
