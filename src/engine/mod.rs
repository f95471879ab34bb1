//! Plan execution engine.
//!
//! The engine resolves an ordered [`Plan`] into applied state: deletes run
//! first (dependents before dependencies), then creates, updates, and
//! replaces run in dependency waves, with every step in a wave applied
//! concurrently. Each applied resource receives a uid standing in for the
//! provider-assigned identifier; no provider API is modeled here.
//!
//! A step failure aborts the remaining waves. Resources applied before the
//! failure stay recorded, so a later run plans only the remainder.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::plan::{Plan, PlanStep, StepAction};
use crate::state::{DeploymentState, JsonStateStore, ResourceRecord, StateError};

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// The step was applied.
    Applied,
    /// The step failed.
    Failed,
    /// The step was not attempted (earlier failure or no-op).
    Skipped,
}

/// The result of executing one plan step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    /// Resource id
    pub resource_id: String,
    /// What the step did
    pub action: StepAction,
    /// How it ended
    pub status: StepStatus,
    /// Failure message, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Wall time spent applying the step
    pub duration_ms: u64,
}

/// The full result of an engine run.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    /// Deployment name
    pub deployment: String,
    /// Unique id of this run
    pub run_id: String,
    /// Step outcomes, in execution order
    pub outcomes: Vec<StepOutcome>,
}

impl DeployReport {
    /// Number of applied steps.
    pub fn applied_count(&self) -> usize {
        self.count(StepStatus::Applied)
    }

    /// Number of failed steps.
    pub fn failed_count(&self) -> usize {
        self.count(StepStatus::Failed)
    }

    /// Number of skipped steps.
    pub fn skipped_count(&self) -> usize {
        self.count(StepStatus::Skipped)
    }

    /// Whether any step failed.
    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    fn count(&self, status: StepStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Receives step outcomes as the engine produces them.
pub trait EventSink: Send + Sync {
    /// Called once per executed step.
    fn on_step(&self, outcome: &StepOutcome) {
        let _ = outcome;
    }
}

/// A sink that discards every event.
pub struct NullSink;

impl EventSink for NullSink {}

/// Executes plans against a state store.
pub struct Engine {
    store: JsonStateStore,
}

impl Engine {
    /// Creates an engine over the given store.
    pub fn new(store: JsonStateStore) -> Self {
        Self { store }
    }

    /// The engine's state store.
    pub fn store(&self) -> &JsonStateStore {
        &self.store
    }

    /// Applies a plan, persisting the resulting state.
    ///
    /// The returned report lists every step outcome; callers decide how to
    /// surface failures. State is saved even when the run aborts early.
    pub async fn apply(
        &self,
        graph: &ResourceGraph,
        plan: &Plan,
        sink: &dyn EventSink,
    ) -> Result<DeployReport> {
        let run_id = Uuid::new_v4().to_string();
        let state = Arc::new(RwLock::new(self.store.load_or_new(&plan.deployment)?));

        tracing::info!(
            deployment = %plan.deployment,
            run_id = %run_id,
            steps = plan.steps().len(),
            "apply started"
        );

        let mut outcomes = Vec::with_capacity(plan.steps().len());
        let mut aborted = false;

        let (deletes, changes, noops) = split_steps(plan);

        for step in noops {
            let outcome = StepOutcome {
                resource_id: step.resource_id.clone(),
                action: step.action,
                status: StepStatus::Skipped,
                message: None,
                duration_ms: 0,
            };
            sink.on_step(&outcome);
            outcomes.push(outcome);
        }

        for step in &deletes {
            if aborted {
                outcomes.push(skipped(step, sink));
                continue;
            }
            let outcome = apply_step(step, graph, &state).await;
            aborted |= outcome.status == StepStatus::Failed;
            sink.on_step(&outcome);
            outcomes.push(outcome);
        }

        for wave in dependency_waves(graph, &changes) {
            if aborted {
                for step in wave {
                    outcomes.push(skipped(step, sink));
                }
                continue;
            }
            let wave_outcomes =
                join_all(wave.iter().map(|step| apply_step(step, graph, &state))).await;
            for outcome in wave_outcomes {
                aborted |= outcome.status == StepStatus::Failed;
                sink.on_step(&outcome);
                outcomes.push(outcome);
            }
        }

        {
            let mut state = state.write();
            state.touch();
            self.store.save(&state)?;
        }

        let report = DeployReport {
            deployment: plan.deployment.clone(),
            run_id,
            outcomes,
        };

        tracing::info!(
            deployment = %report.deployment,
            applied = report.applied_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            "apply finished"
        );

        Ok(report)
    }

    /// Removes a deployment's state document once every resource is gone.
    pub fn purge_if_empty(&self, deployment: &str) -> Result<bool> {
        match self.store.load(deployment) {
            Ok(state) if state.is_empty() => {
                self.store.delete(deployment)?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(StateError::DeploymentNotFound(_)) => Ok(false),
            Err(e) => Err(Error::State(e)),
        }
    }
}

fn skipped(step: &PlanStep, sink: &dyn EventSink) -> StepOutcome {
    let outcome = StepOutcome {
        resource_id: step.resource_id.clone(),
        action: step.action,
        status: StepStatus::Skipped,
        message: Some("not attempted after earlier failure".to_string()),
        duration_ms: 0,
    };
    sink.on_step(&outcome);
    outcome
}

fn split_steps(plan: &Plan) -> (Vec<&PlanStep>, Vec<&PlanStep>, Vec<&PlanStep>) {
    let mut deletes = Vec::new();
    let mut changes = Vec::new();
    let mut noops = Vec::new();
    for step in plan.steps() {
        match step.action {
            StepAction::Delete => deletes.push(step),
            StepAction::Noop => noops.push(step),
            _ => changes.push(step),
        }
    }
    (deletes, changes, noops)
}

/// Groups change steps into waves: a step lands one wave after the last of
/// its in-plan dependencies. Steps within a wave are independent and run
/// concurrently.
fn dependency_waves<'a>(
    graph: &ResourceGraph,
    changes: &[&'a PlanStep],
) -> Vec<Vec<&'a PlanStep>> {
    use std::collections::HashMap;

    let mut wave_of: HashMap<&str, usize> = HashMap::new();
    let mut waves: Vec<Vec<&'a PlanStep>> = Vec::new();

    // Plan steps arrive in creation order, so dependencies are resolved
    // before their dependents.
    for step in changes {
        let wave = graph
            .dependency_ids(&step.resource_id)
            .iter()
            .filter_map(|dep| wave_of.get(dep.as_str()))
            .map(|w| w + 1)
            .max()
            .unwrap_or(0);
        wave_of.insert(step.resource_id.as_str(), wave);
        if waves.len() <= wave {
            waves.resize_with(wave + 1, Vec::new);
        }
        waves[wave].push(step);
    }

    waves
}

async fn apply_step(
    step: &PlanStep,
    graph: &ResourceGraph,
    state: &RwLock<DeploymentState>,
) -> StepOutcome {
    let started = Instant::now();
    let result = execute(step, graph, state);

    let (status, message) = match result {
        Ok(()) => (StepStatus::Applied, None),
        Err(e) => (StepStatus::Failed, Some(e.to_string())),
    };

    tracing::debug!(
        resource = %step.resource_id,
        action = %step.action,
        ?status,
        "step finished"
    );

    StepOutcome {
        resource_id: step.resource_id.clone(),
        action: step.action,
        status,
        message,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

fn execute(step: &PlanStep, graph: &ResourceGraph, state: &RwLock<DeploymentState>) -> Result<()> {
    match step.action {
        StepAction::Delete => {
            state
                .write()
                .remove(&step.resource_id)
                .ok_or_else(|| StateError::RecordNotFound(step.resource_id.clone()))?;
            Ok(())
        }
        StepAction::Create | StepAction::Replace => {
            let record = new_record(step, graph)?;
            let mut state = state.write();
            if step.action == StepAction::Replace {
                state
                    .remove(&step.resource_id)
                    .ok_or_else(|| StateError::RecordNotFound(step.resource_id.clone()))?;
            }
            state.upsert(record);
            Ok(())
        }
        StepAction::Update => {
            let desired = desired_json(step)?;
            let mut state = state.write();
            let mut record = state
                .get(&step.resource_id)
                .cloned()
                .ok_or_else(|| StateError::RecordNotFound(step.resource_id.clone()))?;
            record.spec = desired;
            record.dependencies = graph.dependency_ids(&step.resource_id);
            record.updated_at = Utc::now();
            state.upsert(record);
            Ok(())
        }
        StepAction::Noop => Ok(()),
    }
}

fn new_record(step: &PlanStep, graph: &ResourceGraph) -> Result<ResourceRecord> {
    let now = Utc::now();
    Ok(ResourceRecord {
        id: step.resource_id.clone(),
        kind: step.kind,
        uid: Uuid::new_v4().to_string(),
        spec: desired_json(step)?,
        dependencies: graph.dependency_ids(&step.resource_id),
        created_at: now,
        updated_at: now,
    })
}

fn desired_json(step: &PlanStep) -> Result<serde_json::Value> {
    let spec = step
        .desired
        .as_ref()
        .ok_or_else(|| Error::apply_failed(&step.resource_id, "step carries no desired spec"))?;
    Ok(serde_json::to_value(spec)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::plan;

    fn demo_graph() -> ResourceGraph {
        let yaml = r#"
name: engine-demo
networks:
  - id: net-a
    cidr: 192.0.2.0/24
    subnets:
      - id: net-a-public
        tier: public
      - id: net-a-private
        tier: private
"#;
        let manifest = Manifest::from_yaml(yaml, None).unwrap();
        ResourceGraph::from_manifest(&manifest).unwrap()
    }

    #[test]
    fn test_dependency_waves_put_network_first() {
        let graph = demo_graph();
        let state = DeploymentState::new("demo");
        let plan = plan::plan("demo", &graph, &state).unwrap();
        let (_, changes, _) = split_steps(&plan);

        let waves = dependency_waves(&graph, &changes);
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].len(), 1);
        assert_eq!(waves[0][0].resource_id, "net-a");
        assert_eq!(waves[1].len(), 2);
    }

    #[tokio::test]
    async fn test_apply_records_every_resource() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(JsonStateStore::new(dir.path()).unwrap());
        let graph = demo_graph();
        let state = engine.store().load_or_new("demo").unwrap();
        let plan = plan::plan("demo", &graph, &state).unwrap();

        let report = engine.apply(&graph, &plan, &NullSink).await.unwrap();
        assert!(!report.has_failures());
        assert_eq!(report.applied_count(), 3);

        let state = engine.store().load("demo").unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.serial, 1);
        let record = state.get("net-a-public").unwrap();
        assert_eq!(record.dependencies, vec!["net-a".to_string()]);
        assert!(!record.uid.is_empty());
    }

    #[tokio::test]
    async fn test_second_apply_is_all_noops() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(JsonStateStore::new(dir.path()).unwrap());
        let graph = demo_graph();

        let state = engine.store().load_or_new("demo").unwrap();
        let plan1 = plan::plan("demo", &graph, &state).unwrap();
        engine.apply(&graph, &plan1, &NullSink).await.unwrap();

        let state = engine.store().load("demo").unwrap();
        let plan2 = plan::plan("demo", &graph, &state).unwrap();
        assert!(!plan2.has_changes());

        let report = engine.apply(&graph, &plan2, &NullSink).await.unwrap();
        assert_eq!(report.applied_count(), 0);
        assert_eq!(report.skipped_count(), 3);
    }

    #[tokio::test]
    async fn test_destroy_empties_state() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(JsonStateStore::new(dir.path()).unwrap());
        let graph = demo_graph();

        let state = engine.store().load_or_new("demo").unwrap();
        let plan1 = plan::plan("demo", &graph, &state).unwrap();
        engine.apply(&graph, &plan1, &NullSink).await.unwrap();

        let empty = ResourceGraph::new();
        let state = engine.store().load("demo").unwrap();
        let plan2 = plan::plan("demo", &empty, &state).unwrap();
        assert_eq!(plan2.summary().delete, 3);

        let report = engine.apply(&empty, &plan2, &NullSink).await.unwrap();
        assert!(!report.has_failures());

        let state = engine.store().load("demo").unwrap();
        assert!(state.is_empty());
        assert!(engine.purge_if_empty("demo").unwrap());
        assert!(engine.store().list().unwrap().is_empty());
    }
}
