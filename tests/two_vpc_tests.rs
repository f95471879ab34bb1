//! End-to-end tests for the two-container demo topology.
//!
//! These exercise the full pipeline on demos/two-vpc.yaml: manifest
//! parsing with variable interpolation, graph resolution, the structural
//! validity of the emitted graph (address ranges, route wiring, endpoint
//! placement, security scoping), and a deploy/destroy round through the
//! engine.

use std::path::PathBuf;

use pretty_assertions::assert_eq;

use netforge::engine::{Engine, NullSink};
use netforge::graph::{ResourceGraph, ResourceKind, ResourceSpec};
use netforge::manifest::Manifest;
use netforge::plan;
use netforge::state::JsonStateStore;
use netforge::validate;

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/two-vpc.yaml")
}

async fn demo_graph() -> (Manifest, ResourceGraph) {
    let manifest = Manifest::from_file(demo_path()).await.unwrap();
    let graph = ResourceGraph::from_manifest(&manifest).unwrap();
    (manifest, graph)
}

#[tokio::test]
async fn test_demo_declares_two_non_overlapping_networks() {
    let (_, graph) = demo_graph().await;

    let networks: Vec<_> = graph.resources_of_kind(ResourceKind::Network).collect();
    assert_eq!(networks.len(), 2);

    let blocks: Vec<_> = networks
        .iter()
        .map(|r| match &r.spec {
            ResourceSpec::Network(n) => n.cidr,
            other => panic!("unexpected spec {other:?}"),
        })
        .collect();
    assert!(!blocks[0].overlaps(&blocks[1]));
}

#[tokio::test]
async fn test_demo_routes_resolve_to_declared_peering() {
    let (_, graph) = demo_graph().await;

    let routes: Vec<_> = graph.resources_of_kind(ResourceKind::Route).collect();
    assert_eq!(routes.len(), 2, "one public route per direction");

    for route in routes {
        let ResourceSpec::Route(spec) = &route.spec else {
            panic!("expected route spec");
        };
        let peering = graph.get(&spec.via_peering).expect("peering exists");
        assert_eq!(peering.kind(), ResourceKind::Peering);
        let subnet = graph.get(&spec.subnet).expect("subnet exists");
        assert_eq!(subnet.kind(), ResourceKind::Subnet);
    }
}

#[tokio::test]
async fn test_demo_endpoints_and_instances_sit_in_their_network() {
    let (_, graph) = demo_graph().await;

    for endpoint in graph.resources_of_kind(ResourceKind::InterfaceEndpoint) {
        let ResourceSpec::InterfaceEndpoint(spec) = &endpoint.spec else {
            panic!("expected endpoint spec");
        };
        for subnet_id in &spec.subnets {
            let ResourceSpec::Subnet(subnet) = &graph.get(subnet_id).unwrap().spec else {
                panic!("expected subnet spec");
            };
            assert_eq!(subnet.network, spec.network);
        }
    }

    for instance in graph.resources_of_kind(ResourceKind::Instance) {
        let ResourceSpec::Instance(spec) = &instance.spec else {
            panic!("expected instance spec");
        };
        assert!(graph.contains(&spec.subnet));
        assert!(graph.contains(&spec.security_group));
    }
}

#[tokio::test]
async fn test_demo_ingress_sources_are_declared_blocks() {
    let (_, graph) = demo_graph().await;

    let blocks: Vec<_> = graph
        .resources_of_kind(ResourceKind::Network)
        .map(|r| match &r.spec {
            ResourceSpec::Network(n) => n.cidr,
            other => panic!("unexpected spec {other:?}"),
        })
        .collect();

    for group in graph.resources_of_kind(ResourceKind::SecurityGroup) {
        let ResourceSpec::SecurityGroup(spec) = &group.spec else {
            panic!("expected security group spec");
        };
        for rule in &spec.ingress {
            assert!(
                blocks.iter().any(|b| b.contains_cidr(&rule.source_cidr)),
                "ingress source {} is not a declared block",
                rule.source_cidr
            );
        }
    }
}

#[tokio::test]
async fn test_demo_passes_validation() {
    let (_, graph) = demo_graph().await;
    let report = validate::validate(&graph);
    assert!(report.is_clean(), "violations: {:?}", report);
}

#[tokio::test]
async fn test_demo_resource_counts_and_interpolation() {
    let (manifest, graph) = demo_graph().await;

    assert_eq!(graph.resources_of_kind(ResourceKind::Network).count(), 2);
    assert_eq!(graph.resources_of_kind(ResourceKind::Subnet).count(), 4);
    assert_eq!(graph.resources_of_kind(ResourceKind::Peering).count(), 1);
    assert_eq!(
        graph
            .resources_of_kind(ResourceKind::InterfaceEndpoint)
            .count(),
        3
    );
    assert_eq!(
        graph
            .resources_of_kind(ResourceKind::GatewayEndpoint)
            .count(),
        1
    );
    assert_eq!(graph.resources_of_kind(ResourceKind::Route).count(), 2);
    assert_eq!(
        graph.resources_of_kind(ResourceKind::SecurityGroup).count(),
        2
    );
    assert_eq!(graph.resources_of_kind(ResourceKind::Instance).count(), 4);
    assert_eq!(graph.resource_count(), 19);

    // The machine var is interpolated into every instance.
    for instance in &manifest.instances {
        assert_eq!(instance.machine, "t3.micro");
    }
}

#[tokio::test]
async fn test_demo_subnets_carved_in_declaration_order() {
    let (_, graph) = demo_graph().await;

    let expected = [
        ("vpc-a-public", "192.0.2.0/28"),
        ("vpc-a-private", "192.0.2.16/28"),
        ("vpc-a-isolated", "192.0.2.32/28"),
        ("vpc-b-public", "198.51.100.0/28"),
    ];
    for (id, block) in expected {
        let ResourceSpec::Subnet(subnet) = &graph.get(id).unwrap().spec else {
            panic!("expected subnet spec");
        };
        assert_eq!(subnet.cidr.to_string(), block, "subnet {id}");
    }
}

#[tokio::test]
async fn test_demo_synth_document_is_ordered() {
    let (manifest, graph) = demo_graph().await;
    let doc = graph.to_document(&manifest.name).unwrap();

    assert_eq!(doc.resources.len(), 19);
    let pos = |id: &str| doc.resources.iter().position(|r| r.id == id).unwrap();
    assert!(pos("vpc-a") < pos("vpc-a-public"));
    assert!(pos("a-to-b") < pos("vpc-a-public-via-a-to-b"));
    assert!(pos("vpc-a-isolated") < pos("vpc-a-ssm"));
}

#[tokio::test]
async fn test_demo_deploy_and_destroy_round_trip() {
    let (manifest, graph) = demo_graph().await;
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(JsonStateStore::new(dir.path()).unwrap());

    // First deploy creates everything.
    let state = engine.store().load_or_new(&manifest.name).unwrap();
    let first = plan::plan(&manifest.name, &graph, &state).unwrap();
    assert_eq!(first.summary().create, 19);

    let report = engine.apply(&graph, &first, &NullSink).await.unwrap();
    assert!(!report.has_failures());
    assert_eq!(report.applied_count(), 19);

    // A second plan against the same manifest is all no-ops.
    let state = engine.store().load(&manifest.name).unwrap();
    let second = plan::plan(&manifest.name, &graph, &state).unwrap();
    assert!(!second.has_changes());

    // Destroy deletes everything, dependents first.
    let empty = ResourceGraph::new();
    let state = engine.store().load(&manifest.name).unwrap();
    let teardown = plan::plan(&manifest.name, &empty, &state).unwrap();
    assert_eq!(teardown.summary().delete, 19);

    let order: Vec<&str> = teardown
        .steps()
        .iter()
        .map(|s| s.resource_id.as_str())
        .collect();
    let pos = |id: &str| order.iter().position(|x| *x == id).unwrap();
    assert!(pos("vpc-a-public-host") < pos("vpc-a-public"));
    assert!(pos("vpc-a-public") < pos("vpc-a"));
    assert!(pos("vpc-a-public-via-a-to-b") < pos("a-to-b"));

    let report = engine.apply(&empty, &teardown, &NullSink).await.unwrap();
    assert!(!report.has_failures());
    assert!(engine.store().load(&manifest.name).unwrap().is_empty());
}
