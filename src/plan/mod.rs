//! Change planning.
//!
//! The planner diffs a desired resource graph against the recorded state of
//! a deployment and produces an ordered [`Plan`]: resources to delete first
//! (dependents before their dependencies), then resources to create,
//! update, or replace in creation order. Resources whose recorded
//! properties already match the desired properties become no-op steps.

mod diff;

pub use diff::{diff_properties, requires_replacement};

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::graph::{ResourceGraph, ResourceKind, ResourceSpec};
use crate::state::DeploymentState;

/// What a plan step does to its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    /// Bring a new resource into existence
    Create,
    /// Change mutable properties in place
    Update,
    /// Tear down and recreate (identity properties changed)
    Replace,
    /// Remove a recorded resource
    Delete,
    /// Nothing to do
    Noop,
}

impl StepAction {
    /// Whether the step changes anything.
    pub fn is_change(&self) -> bool {
        !matches!(self, StepAction::Noop)
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::Create => write!(f, "create"),
            StepAction::Update => write!(f, "update"),
            StepAction::Replace => write!(f, "replace"),
            StepAction::Delete => write!(f, "delete"),
            StepAction::Noop => write!(f, "no-op"),
        }
    }
}

/// One changed property, with its recorded and desired values.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyChange {
    /// Property name
    pub path: String,
    /// Recorded value (null when newly set)
    pub old: serde_json::Value,
    /// Desired value (null when removed)
    pub new: serde_json::Value,
}

/// One ordered step of a plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanStep {
    /// Resource id
    pub resource_id: String,
    /// Resource kind
    pub kind: ResourceKind,
    /// What the step does
    pub action: StepAction,
    /// Property-level changes (empty for create/delete/no-op)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<PropertyChange>,
    /// Desired properties (absent for deletes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired: Option<ResourceSpec>,
}

/// Step counts of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    /// Resources to create
    pub create: usize,
    /// Resources to update in place
    pub update: usize,
    /// Resources to replace
    pub replace: usize,
    /// Resources to delete
    pub delete: usize,
    /// Resources left untouched
    pub noop: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.noop
        )
    }
}

/// An ordered set of steps turning recorded state into desired state.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// Deployment the plan applies to
    pub deployment: String,
    /// When the plan was computed
    pub created_at: DateTime<Utc>,
    steps: Vec<PlanStep>,
}

impl Plan {
    /// All steps in execution order (deletes first).
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// The steps that change something.
    pub fn changing_steps(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().filter(|s| s.action.is_change())
    }

    /// Whether the plan changes anything.
    pub fn has_changes(&self) -> bool {
        self.changing_steps().next().is_some()
    }

    /// Step counts.
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for step in &self.steps {
            match step.action {
                StepAction::Create => summary.create += 1,
                StepAction::Update => summary.update += 1,
                StepAction::Replace => summary.replace += 1,
                StepAction::Delete => summary.delete += 1,
                StepAction::Noop => summary.noop += 1,
            }
        }
        summary
    }
}

/// Computes the plan turning `state` into the topology described by
/// `graph`.
pub fn plan(
    deployment: impl Into<String>,
    graph: &ResourceGraph,
    state: &DeploymentState,
) -> Result<Plan> {
    let deployment = deployment.into();
    let creation_order = graph.creation_order()?;
    let desired: HashSet<&str> = creation_order.iter().map(String::as_str).collect();

    let mut steps = Vec::new();

    // Deletes first, dependents before their dependencies.
    for id in deletion_order(state)? {
        if !desired.contains(id.as_str()) {
            let record = state.get(&id).ok_or_else(|| {
                Error::Internal(format!("deletion order produced unknown record '{id}'"))
            })?;
            steps.push(PlanStep {
                resource_id: id.clone(),
                kind: record.kind,
                action: StepAction::Delete,
                changes: Vec::new(),
                desired: None,
            });
        }
    }

    for id in &creation_order {
        let resource = graph
            .get(id)
            .ok_or_else(|| Error::Internal(format!("creation order produced unknown id '{id}'")))?;
        let desired_json = serde_json::to_value(&resource.spec)?;

        let step = match state.get(id) {
            None => PlanStep {
                resource_id: id.clone(),
                kind: resource.kind(),
                action: StepAction::Create,
                changes: Vec::new(),
                desired: Some(resource.spec.clone()),
            },
            Some(record) if record.spec == desired_json => PlanStep {
                resource_id: id.clone(),
                kind: resource.kind(),
                action: StepAction::Noop,
                changes: Vec::new(),
                desired: Some(resource.spec.clone()),
            },
            Some(record) => {
                let changes = diff_properties(&record.spec, &desired_json);
                let action = if requires_replacement(resource.kind(), &changes) {
                    StepAction::Replace
                } else {
                    StepAction::Update
                };
                PlanStep {
                    resource_id: id.clone(),
                    kind: resource.kind(),
                    action,
                    changes,
                    desired: Some(resource.spec.clone()),
                }
            }
        };
        steps.push(step);
    }

    Ok(Plan {
        deployment,
        created_at: Utc::now(),
        steps,
    })
}

/// Orders all recorded resources so that dependents come before the
/// resources they depend on.
fn deletion_order(state: &DeploymentState) -> Result<Vec<String>> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut indices = HashMap::new();

    for record in state.records() {
        let idx = graph.add_node(record.id.clone());
        indices.insert(record.id.as_str(), idx);
    }
    for record in state.records() {
        for dependency in &record.dependencies {
            if let (Some(&from), Some(&to)) = (
                indices.get(dependency.as_str()),
                indices.get(record.id.as_str()),
            ) {
                graph.add_edge(from, to, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order
            .into_iter()
            .rev()
            .filter_map(|idx| graph.node_weight(idx).cloned())
            .collect()),
        Err(cycle) => Err(Error::DependencyCycle(format!(
            "recorded state contains a dependency cycle involving '{}'",
            graph
                .node_weight(cycle.node_id())
                .cloned()
                .unwrap_or_default()
        ))),
    }
}
