//! The individual validation rules.
//!
//! Each rule appends violations to the shared report. Rule codes are
//! stable: scripts may match on them.

use crate::graph::{ResourceKind, ResourceSpec};

use super::{Topology, ValidationReport, Violation};

/// Network blocks must not overlap.
pub const RULE_NET_OVERLAP: &str = "net-overlap";
/// Subnet blocks must lie inside their network block.
pub const RULE_SUBNET_FIT: &str = "subnet-fit";
/// Peerings must join two distinct, non-overlapping networks.
pub const RULE_PEERING_SHAPE: &str = "peering-shape";
/// Routes must resolve to a declared peering joining the route's network.
pub const RULE_ROUTE_PEERING: &str = "route-peering";
/// Endpoint subnets must belong to the endpoint's network.
pub const RULE_ENDPOINT_SUBNET: &str = "endpoint-subnet";
/// Instances must sit in an existing subnet with a group of that network.
pub const RULE_INSTANCE_PLACEMENT: &str = "instance-placement";
/// Ingress sources must fall within a declared network block.
pub const RULE_SG_SCOPE: &str = "sg-scope";

pub(super) fn check_network_overlap(topology: &Topology<'_>, report: &mut ValidationReport) {
    let mut networks: Vec<(&str, _)> = topology
        .networks
        .iter()
        .map(|(id, spec)| (*id, spec.cidr))
        .collect();
    networks.sort_by_key(|(id, _)| *id);

    for (i, (id_a, cidr_a)) in networks.iter().enumerate() {
        for (id_b, cidr_b) in &networks[i + 1..] {
            if cidr_a.overlaps(cidr_b) {
                report.push(Violation::error(
                    RULE_NET_OVERLAP,
                    *id_b,
                    format!("block {cidr_b} overlaps network '{id_a}' ({cidr_a})"),
                ));
            }
        }
    }
}

pub(super) fn check_subnet_fit(topology: &Topology<'_>, report: &mut ValidationReport) {
    for (id, subnet) in &topology.subnets {
        let Some(network) = topology.networks.get(subnet.network.as_str()) else {
            report.push(Violation::error(
                RULE_SUBNET_FIT,
                *id,
                format!("parent network '{}' is not declared", subnet.network),
            ));
            continue;
        };
        if !network.cidr.contains_cidr(&subnet.cidr) {
            report.push(Violation::error(
                RULE_SUBNET_FIT,
                *id,
                format!(
                    "block {} lies outside network '{}' ({})",
                    subnet.cidr, subnet.network, network.cidr
                ),
            ));
        }
    }
}

pub(super) fn check_peering_shape(topology: &Topology<'_>, report: &mut ValidationReport) {
    for (id, peering) in &topology.peerings {
        if peering.requester == peering.accepter {
            report.push(Violation::error(
                RULE_PEERING_SHAPE,
                *id,
                "peering joins a network to itself".to_string(),
            ));
            continue;
        }
        let requester = topology.networks.get(peering.requester.as_str());
        let accepter = topology.networks.get(peering.accepter.as_str());
        for (side, network) in [("requester", requester), ("accepter", accepter)] {
            if network.is_none() {
                report.push(Violation::error(
                    RULE_PEERING_SHAPE,
                    *id,
                    format!("{side} network is not declared"),
                ));
            }
        }
        if let (Some(requester), Some(accepter)) = (requester, accepter) {
            if requester.cidr.overlaps(&accepter.cidr) {
                report.push(Violation::error(
                    RULE_PEERING_SHAPE,
                    *id,
                    format!(
                        "peered blocks overlap ({} and {})",
                        requester.cidr, accepter.cidr
                    ),
                ));
            }
        }
    }
}

pub(super) fn check_route_peering(topology: &Topology<'_>, report: &mut ValidationReport) {
    for (id, route) in &topology.routes {
        let Some(peering) = topology.peerings.get(route.via_peering.as_str()) else {
            report.push(Violation::error(
                RULE_ROUTE_PEERING,
                *id,
                format!("peering '{}' is not declared", route.via_peering),
            ));
            continue;
        };
        let Some(subnet) = topology.subnets.get(route.subnet.as_str()) else {
            report.push(Violation::error(
                RULE_ROUTE_PEERING,
                *id,
                format!("subnet '{}' is not declared", route.subnet),
            ));
            continue;
        };

        let near = subnet.network.as_str();
        let far = if near == peering.requester {
            Some(peering.accepter.as_str())
        } else if near == peering.accepter {
            Some(peering.requester.as_str())
        } else {
            None
        };

        let Some(far) = far else {
            report.push(Violation::error(
                RULE_ROUTE_PEERING,
                *id,
                format!(
                    "subnet '{}' belongs to '{}', which peering '{}' does not join",
                    route.subnet, near, route.via_peering
                ),
            ));
            continue;
        };

        if let Some(far_network) = topology.networks.get(far) {
            if !route.destination.overlaps(&far_network.cidr) {
                report.push(Violation::warning(
                    RULE_ROUTE_PEERING,
                    *id,
                    format!(
                        "destination {} does not overlap peered network '{}' ({})",
                        route.destination, far, far_network.cidr
                    ),
                ));
            }
        }
    }
}

pub(super) fn check_endpoint_subnets(topology: &Topology<'_>, report: &mut ValidationReport) {
    for (id, endpoint) in &topology.endpoints {
        if !topology.networks.contains_key(endpoint.network.as_str()) {
            report.push(Violation::error(
                RULE_ENDPOINT_SUBNET,
                *id,
                format!("network '{}' is not declared", endpoint.network),
            ));
            continue;
        }
        for subnet_id in &endpoint.subnets {
            match topology.subnets.get(subnet_id.as_str()) {
                None => report.push(Violation::error(
                    RULE_ENDPOINT_SUBNET,
                    *id,
                    format!("subnet '{subnet_id}' is not declared"),
                )),
                Some(subnet) if subnet.network != endpoint.network => {
                    report.push(Violation::error(
                        RULE_ENDPOINT_SUBNET,
                        *id,
                        format!(
                            "subnet '{}' belongs to '{}', not '{}'",
                            subnet_id, subnet.network, endpoint.network
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    for resource in topology.graph.resources_of_kind(ResourceKind::GatewayEndpoint) {
        if let ResourceSpec::GatewayEndpoint(spec) = &resource.spec {
            if !topology.networks.contains_key(spec.network.as_str()) {
                report.push(Violation::error(
                    RULE_ENDPOINT_SUBNET,
                    &resource.id,
                    format!("network '{}' is not declared", spec.network),
                ));
            }
        }
    }
}

pub(super) fn check_instance_placement(topology: &Topology<'_>, report: &mut ValidationReport) {
    for resource in topology.graph.resources_of_kind(ResourceKind::Instance) {
        let ResourceSpec::Instance(instance) = &resource.spec else {
            continue;
        };
        let Some(subnet) = topology.subnets.get(instance.subnet.as_str()) else {
            report.push(Violation::error(
                RULE_INSTANCE_PLACEMENT,
                &resource.id,
                format!("subnet '{}' is not declared", instance.subnet),
            ));
            continue;
        };
        match topology.graph.get(&instance.security_group).map(|r| &r.spec) {
            Some(ResourceSpec::SecurityGroup(group)) => {
                if group.network != subnet.network {
                    report.push(Violation::error(
                        RULE_INSTANCE_PLACEMENT,
                        &resource.id,
                        format!(
                            "security group '{}' is scoped to '{}', but the instance sits in '{}'",
                            instance.security_group, group.network, subnet.network
                        ),
                    ));
                }
            }
            _ => report.push(Violation::error(
                RULE_INSTANCE_PLACEMENT,
                &resource.id,
                format!(
                    "security group '{}' is not declared",
                    instance.security_group
                ),
            )),
        }
    }
}

pub(super) fn check_security_group_scope(topology: &Topology<'_>, report: &mut ValidationReport) {
    for resource in topology.graph.resources_of_kind(ResourceKind::SecurityGroup) {
        let ResourceSpec::SecurityGroup(group) = &resource.spec else {
            continue;
        };
        for rule in &group.ingress {
            let covered = topology
                .networks
                .values()
                .any(|network| network.cidr.contains_cidr(&rule.source_cidr));
            if !covered {
                report.push(Violation::error(
                    RULE_SG_SCOPE,
                    &resource.id,
                    format!(
                        "ingress source {} is not within any declared network block",
                        rule.source_cidr
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ResourceGraph;
    use crate::manifest::Manifest;
    use crate::validate::validate;

    fn graph_for(yaml: &str) -> ResourceGraph {
        let manifest = Manifest::from_yaml(yaml, None).unwrap();
        ResourceGraph::from_manifest(&manifest).unwrap()
    }

    #[test]
    fn test_clean_topology_passes() {
        let graph = graph_for(
            r#"
name: clean
networks:
  - id: net-a
    cidr: 192.0.2.0/24
    subnets:
      - id: net-a-public
        tier: public
  - id: net-b
    cidr: 198.51.100.0/24
    subnets:
      - id: net-b-public
        tier: public
peerings:
  - id: a-to-b
    requester: net-a
    accepter: net-b
security_groups:
  - id: sg-a
    network: net-a
    ingress:
      - source_cidr: 192.0.2.0/24
        protocol: icmp
instances:
  - id: host-a
    subnet: net-a-public
    security_group: sg-a
"#,
        );
        let report = validate(&graph);
        assert!(report.is_clean(), "violations: {:?}", report);
    }

    #[test]
    fn test_overlapping_networks_fail() {
        let graph = graph_for(
            r#"
name: overlap
networks:
  - id: net-a
    cidr: 10.0.0.0/16
  - id: net-b
    cidr: 10.0.128.0/17
"#,
        );
        let report = validate(&graph);
        assert!(report.has_errors());
        assert!(report.violations().any(|v| v.rule == RULE_NET_OVERLAP));
    }

    #[test]
    fn test_self_peering_fails() {
        let graph = graph_for(
            r#"
name: selfpeer
networks:
  - id: net-a
    cidr: 10.0.0.0/16
peerings:
  - id: a-to-a
    requester: net-a
    accepter: net-a
"#,
        );
        let report = validate(&graph);
        assert!(report
            .violations()
            .any(|v| v.rule == RULE_PEERING_SHAPE && v.resource == "a-to-a"));
    }

    #[test]
    fn test_route_through_unrelated_peering_fails() {
        let graph = graph_for(
            r#"
name: stray-route
networks:
  - id: net-a
    cidr: 192.0.2.0/24
    subnets:
      - id: net-a-public
        tier: public
  - id: net-b
    cidr: 198.51.100.0/24
  - id: net-c
    cidr: 203.0.113.0/24
peerings:
  - id: b-to-c
    requester: net-b
    accepter: net-c
    route_tiers: []
routes:
  - id: bad-route
    subnet: net-a-public
    destination: 198.51.100.0/24
    via_peering: b-to-c
"#,
        );
        let report = validate(&graph);
        assert!(report
            .violations()
            .any(|v| v.rule == RULE_ROUTE_PEERING && v.resource == "bad-route"));
    }

    #[test]
    fn test_cross_network_endpoint_subnet_fails() {
        let graph = graph_for(
            r#"
name: cross-endpoint
networks:
  - id: net-a
    cidr: 192.0.2.0/24
    subnets:
      - id: net-a-isolated
        tier: isolated
  - id: net-b
    cidr: 198.51.100.0/24
endpoints:
  - id: svc
    service: ssm
    network: net-b
    subnets: [net-a-isolated]
"#,
        );
        let report = validate(&graph);
        assert!(report
            .violations()
            .any(|v| v.rule == RULE_ENDPOINT_SUBNET && v.resource == "svc"));
    }

    #[test]
    fn test_foreign_security_group_fails() {
        let graph = graph_for(
            r#"
name: foreign-sg
networks:
  - id: net-a
    cidr: 192.0.2.0/24
    subnets:
      - id: net-a-public
        tier: public
  - id: net-b
    cidr: 198.51.100.0/24
security_groups:
  - id: sg-b
    network: net-b
instances:
  - id: host
    subnet: net-a-public
    security_group: sg-b
"#,
        );
        let report = validate(&graph);
        assert!(report
            .violations()
            .any(|v| v.rule == RULE_INSTANCE_PLACEMENT && v.resource == "host"));
    }

    #[test]
    fn test_stray_ingress_source_fails() {
        let graph = graph_for(
            r#"
name: stray-ingress
networks:
  - id: net-a
    cidr: 192.0.2.0/24
security_groups:
  - id: sg-a
    network: net-a
    ingress:
      - source_cidr: 203.0.113.0/24
        protocol: icmp
"#,
        );
        let report = validate(&graph);
        assert!(report.violations().any(|v| v.rule == RULE_SG_SCOPE));
    }
}
