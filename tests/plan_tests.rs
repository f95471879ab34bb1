//! Planner behavior across the deployment lifecycle: create, no-op,
//! in-place update, replace on identity change, and delete ordering.

use netforge::engine::{Engine, NullSink};
use netforge::graph::ResourceGraph;
use netforge::manifest::Manifest;
use netforge::plan::{self, StepAction};
use netforge::state::JsonStateStore;

const BASE: &str = r#"
name: lifecycle
networks:
  - id: net-a
    cidr: 192.0.2.0/24
    nat_gateways: 0
    subnets:
      - id: net-a-public
        tier: public
security_groups:
  - id: sg-a
    network: net-a
instances:
  - id: host
    subnet: net-a-public
    security_group: sg-a
    machine: t3.micro
"#;

fn graph_of(yaml: &str) -> ResourceGraph {
    let manifest = Manifest::from_yaml(yaml, None).unwrap();
    ResourceGraph::from_manifest(&manifest).unwrap()
}

async fn deployed_engine(yaml: &str) -> (Engine, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(JsonStateStore::new(dir.path()).unwrap());
    let graph = graph_of(yaml);
    let state = engine.store().load_or_new("lifecycle").unwrap();
    let plan = plan::plan("lifecycle", &graph, &state).unwrap();
    engine.apply(&graph, &plan, &NullSink).await.unwrap();
    (engine, dir)
}

#[tokio::test]
async fn test_fresh_deployment_is_all_creates() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStateStore::new(dir.path()).unwrap();
    let graph = graph_of(BASE);
    let state = store.load_or_new("lifecycle").unwrap();

    let plan = plan::plan("lifecycle", &graph, &state).unwrap();
    let summary = plan.summary();
    assert_eq!(summary.create, 4);
    assert_eq!(summary.delete, 0);
    assert_eq!(summary.noop, 0);
}

#[tokio::test]
async fn test_mutable_change_plans_update() {
    let (engine, _dir) = deployed_engine(BASE).await;

    // nat_gateways is mutable on a network.
    let changed = BASE.replace("nat_gateways: 0", "nat_gateways: 1");
    let graph = graph_of(&changed);
    let state = engine.store().load("lifecycle").unwrap();
    let plan = plan::plan("lifecycle", &graph, &state).unwrap();

    let step = plan
        .steps()
        .iter()
        .find(|s| s.resource_id == "net-a")
        .unwrap();
    assert_eq!(step.action, StepAction::Update);
    assert_eq!(step.changes.len(), 1);
    assert_eq!(step.changes[0].path, "nat_gateways");

    let summary = plan.summary();
    assert_eq!(summary.update, 1);
    assert_eq!(summary.noop, 3);
}

#[tokio::test]
async fn test_machine_change_updates_instance_in_place() {
    let (engine, _dir) = deployed_engine(BASE).await;

    let changed = BASE.replace("machine: t3.micro", "machine: t3.large");
    let graph = graph_of(&changed);
    let state = engine.store().load("lifecycle").unwrap();
    let plan = plan::plan("lifecycle", &graph, &state).unwrap();

    let step = plan
        .steps()
        .iter()
        .find(|s| s.resource_id == "host")
        .unwrap();
    assert_eq!(step.action, StepAction::Update);
}

#[tokio::test]
async fn test_identity_change_plans_replace() {
    let (engine, _dir) = deployed_engine(BASE).await;

    // Changing the network block changes the carved subnet block too:
    // both are identity properties.
    let changed = BASE.replace("192.0.2.0/24", "198.51.100.0/24");
    let graph = graph_of(&changed);
    let state = engine.store().load("lifecycle").unwrap();
    let plan = plan::plan("lifecycle", &graph, &state).unwrap();

    let network = plan
        .steps()
        .iter()
        .find(|s| s.resource_id == "net-a")
        .unwrap();
    assert_eq!(network.action, StepAction::Replace);

    let subnet = plan
        .steps()
        .iter()
        .find(|s| s.resource_id == "net-a-public")
        .unwrap();
    assert_eq!(subnet.action, StepAction::Replace);
}

#[tokio::test]
async fn test_removed_resource_plans_delete_before_creates() {
    let (engine, _dir) = deployed_engine(BASE).await;

    let without_instance = BASE
        .lines()
        .take_while(|line| !line.starts_with("instances:"))
        .collect::<Vec<_>>()
        .join("\n");
    let graph = graph_of(&without_instance);
    let state = engine.store().load("lifecycle").unwrap();
    let plan = plan::plan("lifecycle", &graph, &state).unwrap();

    let summary = plan.summary();
    assert_eq!(summary.delete, 1);
    assert_eq!(summary.noop, 3);
    assert_eq!(plan.steps()[0].resource_id, "host");
    assert_eq!(plan.steps()[0].action, StepAction::Delete);
}

#[tokio::test]
async fn test_replace_applies_with_fresh_uid() {
    let (engine, _dir) = deployed_engine(BASE).await;
    let old_uid = engine
        .store()
        .load("lifecycle")
        .unwrap()
        .get("net-a")
        .unwrap()
        .uid
        .clone();

    let changed = BASE.replace("192.0.2.0/24", "198.51.100.0/24");
    let graph = graph_of(&changed);
    let state = engine.store().load("lifecycle").unwrap();
    let plan = plan::plan("lifecycle", &graph, &state).unwrap();
    let report = engine.apply(&graph, &plan, &NullSink).await.unwrap();
    assert!(!report.has_failures());

    let new_uid = engine
        .store()
        .load("lifecycle")
        .unwrap()
        .get("net-a")
        .unwrap()
        .uid
        .clone();
    assert_ne!(old_uid, new_uid);
}
