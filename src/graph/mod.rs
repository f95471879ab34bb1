//! Resource dependency graph builder.
//!
//! This module resolves a parsed [`Manifest`] into a typed resource graph:
//! nodes are concrete resources with fully resolved properties (subnets get
//! their carved address blocks, peerings get their synthesized routes), and
//! edges record the dependencies the planner must respect (an instance
//! depends on its subnet, a route depends on its peering connection).
//!
//! The graph is the contract surface of the engine: [`creation_order`]
//! drives apply, its reverse drives destroy, and
//! [`SynthDocument`](crate::graph::SynthDocument) is the serialized form
//! handed to external consumers.
//!
//! [`creation_order`]: ResourceGraph::creation_order

mod document;

pub use document::{DependencyEntry, ResourceEntry, SynthDocument};

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::net::Ipv4Addr;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::cidr::Cidr;
use crate::error::{Error, Result};
use crate::manifest::{IngressRule, Manifest, NetworkDecl, SubnetTier};

/// The kinds of resources a graph can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Network container
    Network,
    /// Subnet partition
    Subnet,
    /// Peering connection
    Peering,
    /// Interface endpoint
    InterfaceEndpoint,
    /// Gateway endpoint
    GatewayEndpoint,
    /// Route table entry
    Route,
    /// Security group
    SecurityGroup,
    /// Compute instance
    Instance,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Network => write!(f, "network"),
            ResourceKind::Subnet => write!(f, "subnet"),
            ResourceKind::Peering => write!(f, "peering"),
            ResourceKind::InterfaceEndpoint => write!(f, "interface-endpoint"),
            ResourceKind::GatewayEndpoint => write!(f, "gateway-endpoint"),
            ResourceKind::Route => write!(f, "route"),
            ResourceKind::SecurityGroup => write!(f, "security-group"),
            ResourceKind::Instance => write!(f, "instance"),
        }
    }
}

/// Fully resolved, typed properties of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResourceSpec {
    /// Network container properties
    Network(NetworkSpec),
    /// Subnet properties (with the carved address block)
    Subnet(SubnetSpec),
    /// Peering connection properties
    Peering(PeeringSpec),
    /// Interface endpoint properties
    InterfaceEndpoint(InterfaceEndpointSpec),
    /// Gateway endpoint properties
    GatewayEndpoint(GatewayEndpointSpec),
    /// Route properties
    Route(RouteSpec),
    /// Security group properties
    SecurityGroup(SecurityGroupSpec),
    /// Instance properties
    Instance(InstanceSpec),
}

impl ResourceSpec {
    /// The kind of resource this spec describes.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceSpec::Network(_) => ResourceKind::Network,
            ResourceSpec::Subnet(_) => ResourceKind::Subnet,
            ResourceSpec::Peering(_) => ResourceKind::Peering,
            ResourceSpec::InterfaceEndpoint(_) => ResourceKind::InterfaceEndpoint,
            ResourceSpec::GatewayEndpoint(_) => ResourceKind::GatewayEndpoint,
            ResourceSpec::Route(_) => ResourceKind::Route,
            ResourceSpec::SecurityGroup(_) => ResourceKind::SecurityGroup,
            ResourceSpec::Instance(_) => ResourceKind::Instance,
        }
    }
}

/// Resolved network container properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Address block
    pub cidr: Cidr,
    /// DNS resolution enabled
    pub dns_support: bool,
    /// DNS hostnames enabled
    pub dns_hostnames: bool,
    /// NAT gateway count
    pub nat_gateways: u8,
}

/// Resolved subnet properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetSpec {
    /// Parent network id
    pub network: String,
    /// Placement tier
    pub tier: SubnetTier,
    /// Carved address block
    pub cidr: Cidr,
}

/// Resolved peering connection properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeeringSpec {
    /// Requesting network id
    pub requester: String,
    /// Accepting network id
    pub accepter: String,
}

/// Resolved interface endpoint properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceEndpointSpec {
    /// Network the endpoint lives in
    pub network: String,
    /// Service identifier
    pub service: String,
    /// Subnets holding endpoint interfaces
    pub subnets: Vec<String>,
}

/// Resolved gateway endpoint properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEndpointSpec {
    /// Network the endpoint is wired into
    pub network: String,
    /// Service identifier
    pub service: String,
}

/// Resolved route properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Subnet whose route table holds the entry
    pub subnet: String,
    /// Destination block
    pub destination: Cidr,
    /// Peering connection carrying the traffic
    pub via_peering: String,
}

/// Resolved security group properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupSpec {
    /// Network the group is scoped to
    pub network: String,
    /// All outbound traffic permitted
    pub allow_all_outbound: bool,
    /// Ingress rules
    pub ingress: Vec<IngressRule>,
}

/// Resolved instance properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Subnet the instance is placed in
    pub subnet: String,
    /// Attached security group
    pub security_group: String,
    /// Machine size
    pub machine: String,
    /// Root volume size in GiB
    pub root_volume_gib: u32,
}

/// A node in the resource graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Manifest-unique id
    pub id: String,
    /// Resolved properties
    #[serde(flatten)]
    pub spec: ResourceSpec,
}

impl Resource {
    /// Creates a resource node.
    pub fn new(id: impl Into<String>, spec: ResourceSpec) -> Self {
        Self {
            id: id.into(),
            spec,
        }
    }

    /// The kind of the resource.
    pub fn kind(&self) -> ResourceKind {
        self.spec.kind()
    }
}

/// Why one resource depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Contained inside the dependency (subnet in network)
    Containment,
    /// Attached to the dependency (endpoint to network/subnet)
    Attachment,
    /// Routes traffic through the dependency
    Routing,
    /// Scoped by the dependency (security group rules)
    Security,
    /// Placed into the dependency (instance in subnet)
    Placement,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKind::Containment => write!(f, "containment"),
            DependencyKind::Attachment => write!(f, "attachment"),
            DependencyKind::Routing => write!(f, "routing"),
            DependencyKind::Security => write!(f, "security"),
            DependencyKind::Placement => write!(f, "placement"),
        }
    }
}

/// The resource dependency graph.
///
/// Edges point from a dependency to its dependents, so a topological sort
/// yields a valid creation order and its reverse a valid destruction order.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    graph: DiGraph<Resource, DependencyKind>,
    indices: HashMap<String, NodeIndex>,
}

impl ResourceGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a manifest into a resource graph.
    ///
    /// This carves subnet blocks out of their network blocks in declaration
    /// order, synthesizes peering routes for the tiers each peering wires,
    /// and records every dependency edge. Unknown references and duplicate
    /// ids are build errors.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        manifest.validate()?;

        let mut graph = Self::new();
        let networks: HashMap<&str, &NetworkDecl> = manifest
            .networks
            .iter()
            .map(|n| (n.id.as_str(), n))
            .collect();

        for network in &manifest.networks {
            graph.add_resource(Resource::new(
                &network.id,
                ResourceSpec::Network(NetworkSpec {
                    cidr: network.cidr,
                    dns_support: network.dns_support,
                    dns_hostnames: network.dns_hostnames,
                    nat_gateways: network.nat_gateways,
                }),
            ))?;

            for (subnet, block) in carve_subnets(network)? {
                graph.add_resource(Resource::new(
                    subnet,
                    ResourceSpec::Subnet(SubnetSpec {
                        network: network.id.clone(),
                        tier: subnet_tier(network, subnet),
                        cidr: block,
                    }),
                ))?;
                graph.add_dependency(&network.id, subnet, DependencyKind::Containment)?;
            }

            for gateway in &network.gateway_endpoints {
                graph.add_resource(Resource::new(
                    &gateway.id,
                    ResourceSpec::GatewayEndpoint(GatewayEndpointSpec {
                        network: network.id.clone(),
                        service: gateway.service.clone(),
                    }),
                ))?;
                graph.add_dependency(&network.id, &gateway.id, DependencyKind::Attachment)?;
            }
        }

        for peering in &manifest.peerings {
            for network in [&peering.requester, &peering.accepter] {
                if !networks.contains_key(network.as_str()) {
                    return Err(Error::unknown_reference(&peering.id, "network", network));
                }
            }
            graph.add_resource(Resource::new(
                &peering.id,
                ResourceSpec::Peering(PeeringSpec {
                    requester: peering.requester.clone(),
                    accepter: peering.accepter.clone(),
                }),
            ))?;
            graph.add_dependency(&peering.requester, &peering.id, DependencyKind::Attachment)?;
            graph.add_dependency(&peering.accepter, &peering.id, DependencyKind::Attachment)?;
        }

        // Synthesized routes: for each wired tier, every matching subnet on
        // one side gets a route to the far side's block, in both directions.
        for peering in &manifest.peerings {
            let sides = [
                (&peering.requester, &peering.accepter),
                (&peering.accepter, &peering.requester),
            ];
            for (near, far) in sides {
                let far_cidr = networks[far.as_str()].cidr;
                for subnet in &networks[near.as_str()].subnets {
                    if !peering.route_tiers.contains(&subnet.tier) {
                        continue;
                    }
                    let route_id = format!("{}-via-{}", subnet.id, peering.id);
                    graph.add_resource(Resource::new(
                        &route_id,
                        ResourceSpec::Route(RouteSpec {
                            subnet: subnet.id.clone(),
                            destination: far_cidr,
                            via_peering: peering.id.clone(),
                        }),
                    ))?;
                    graph.add_dependency(&subnet.id, &route_id, DependencyKind::Routing)?;
                    graph.add_dependency(&peering.id, &route_id, DependencyKind::Routing)?;
                }
            }
        }

        for route in &manifest.routes {
            graph.expect_kind(&route.id, "subnet", &route.subnet, ResourceKind::Subnet)?;
            graph.expect_kind(&route.id, "peering", &route.via_peering, ResourceKind::Peering)?;
            graph.add_resource(Resource::new(
                &route.id,
                ResourceSpec::Route(RouteSpec {
                    subnet: route.subnet.clone(),
                    destination: route.destination,
                    via_peering: route.via_peering.clone(),
                }),
            ))?;
            graph.add_dependency(&route.subnet, &route.id, DependencyKind::Routing)?;
            graph.add_dependency(&route.via_peering, &route.id, DependencyKind::Routing)?;
        }

        for endpoint in &manifest.endpoints {
            graph.expect_kind(&endpoint.id, "network", &endpoint.network, ResourceKind::Network)?;
            for subnet in &endpoint.subnets {
                graph.expect_kind(&endpoint.id, "subnet", subnet, ResourceKind::Subnet)?;
            }
            graph.add_resource(Resource::new(
                &endpoint.id,
                ResourceSpec::InterfaceEndpoint(InterfaceEndpointSpec {
                    network: endpoint.network.clone(),
                    service: endpoint.service.clone(),
                    subnets: endpoint.subnets.clone(),
                }),
            ))?;
            graph.add_dependency(&endpoint.network, &endpoint.id, DependencyKind::Attachment)?;
            for subnet in &endpoint.subnets {
                graph.add_dependency(subnet, &endpoint.id, DependencyKind::Attachment)?;
            }
        }

        for group in &manifest.security_groups {
            graph.expect_kind(&group.id, "network", &group.network, ResourceKind::Network)?;
            graph.add_resource(Resource::new(
                &group.id,
                ResourceSpec::SecurityGroup(SecurityGroupSpec {
                    network: group.network.clone(),
                    allow_all_outbound: group.allow_all_outbound,
                    ingress: group.ingress.clone(),
                }),
            ))?;
            graph.add_dependency(&group.network, &group.id, DependencyKind::Security)?;
        }

        for instance in &manifest.instances {
            graph.expect_kind(&instance.id, "subnet", &instance.subnet, ResourceKind::Subnet)?;
            graph.expect_kind(
                &instance.id,
                "security group",
                &instance.security_group,
                ResourceKind::SecurityGroup,
            )?;
            graph.add_resource(Resource::new(
                &instance.id,
                ResourceSpec::Instance(InstanceSpec {
                    subnet: instance.subnet.clone(),
                    security_group: instance.security_group.clone(),
                    machine: instance.machine.clone(),
                    root_volume_gib: instance.root_volume_gib,
                }),
            ))?;
            graph.add_dependency(&instance.subnet, &instance.id, DependencyKind::Placement)?;
            graph.add_dependency(
                &instance.security_group,
                &instance.id,
                DependencyKind::Security,
            )?;
        }

        Ok(graph)
    }

    /// Adds a resource node. Fails on a duplicate id.
    pub fn add_resource(&mut self, resource: Resource) -> Result<NodeIndex> {
        if self.indices.contains_key(&resource.id) {
            return Err(Error::DuplicateResource(resource.id));
        }
        let id = resource.id.clone();
        let idx = self.graph.add_node(resource);
        self.indices.insert(id, idx);
        Ok(idx)
    }

    /// Adds a dependency edge from `dependency` to `dependent`.
    pub fn add_dependency(
        &mut self,
        dependency: &str,
        dependent: &str,
        kind: DependencyKind,
    ) -> Result<()> {
        let from = self
            .indices
            .get(dependency)
            .copied()
            .ok_or_else(|| Error::unknown_reference(dependent, "dependency", dependency))?;
        let to = self
            .indices
            .get(dependent)
            .copied()
            .ok_or_else(|| Error::unknown_reference(dependency, "dependent", dependent))?;
        self.graph.add_edge(from, to, kind);
        Ok(())
    }

    fn expect_kind(
        &self,
        referrer: &str,
        field: &str,
        target: &str,
        kind: ResourceKind,
    ) -> Result<()> {
        match self.get(target) {
            Some(resource) if resource.kind() == kind => Ok(()),
            _ => Err(Error::unknown_reference(referrer, field, target)),
        }
    }

    /// Looks up a resource by id.
    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.indices.get(id).and_then(|idx| self.graph.node_weight(*idx))
    }

    /// Whether the graph holds a resource with the given id.
    pub fn contains(&self, id: &str) -> bool {
        self.indices.contains_key(id)
    }

    /// Iterates over all resources in insertion order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.graph.node_indices().filter_map(|idx| self.graph.node_weight(idx))
    }

    /// Iterates over the resources of one kind.
    pub fn resources_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources().filter(move |r| r.kind() == kind)
    }

    /// Number of resources.
    pub fn resource_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of dependency edges.
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The direct dependencies of a resource (what it needs before it can
    /// exist), in edge order.
    pub fn dependency_ids(&self, id: &str) -> Vec<String> {
        let Some(&idx) = self.indices.get(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter_map(|edge| self.graph.node_weight(edge.source()).map(|r| r.id.clone()))
            .collect()
    }

    /// All resources that transitively depend on `id`.
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        self.walk(id, Direction::Outgoing)
    }

    /// All resources `id` transitively depends on.
    pub fn dependencies_of(&self, id: &str) -> Vec<String> {
        self.walk(id, Direction::Incoming)
    }

    fn walk(&self, id: &str, direction: Direction) -> Vec<String> {
        let mut found = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(&start) = self.indices.get(id) {
            queue.push_back(start);
            while let Some(current) = queue.pop_front() {
                for neighbor in self.graph.neighbors_directed(current, direction) {
                    if let Some(resource) = self.graph.node_weight(neighbor) {
                        if found.insert(resource.id.clone()) {
                            queue.push_back(neighbor);
                        }
                    }
                }
            }
        }

        found.into_iter().collect()
    }

    /// Whether the graph contains a dependency cycle.
    pub fn has_cycles(&self) -> bool {
        tarjan_scc(&self.graph).iter().any(|scc| scc.len() > 1)
    }

    /// The cycles in the graph, as lists of resource ids.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                scc.into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).map(|r| r.id.clone()))
                    .collect()
            })
            .collect()
    }

    /// Resource ids in an order where every dependency precedes its
    /// dependents.
    pub fn creation_order(&self) -> Result<Vec<String>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).map(|r| r.id.clone()))
                .collect()),
            Err(_) => {
                let cycle = self
                    .cycles()
                    .into_iter()
                    .next()
                    .map(|ids| ids.join(" -> "))
                    .unwrap_or_default();
                Err(Error::DependencyCycle(cycle))
            }
        }
    }

    /// Resource ids in an order where every dependent precedes its
    /// dependencies (the order for tearing the topology down).
    pub fn destruction_order(&self) -> Result<Vec<String>> {
        let mut order = self.creation_order()?;
        order.reverse();
        Ok(order)
    }

    /// Serializes the graph into a synthesis document.
    pub fn to_document(&self, topology: impl Into<String>) -> Result<SynthDocument> {
        SynthDocument::from_graph(topology, self)
    }

    /// Generates a DOT representation for visualization.
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph resources {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box];\n\n");

        for idx in self.graph.node_indices() {
            if let Some(resource) = self.graph.node_weight(idx) {
                output.push_str(&format!(
                    "  \"{}\" [label=\"{}\\n{}\"];\n",
                    resource.id,
                    resource.id,
                    resource.kind()
                ));
            }
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            let source = self
                .graph
                .node_weight(edge.source())
                .map(|r| r.id.as_str())
                .unwrap_or("?");
            let target = self
                .graph
                .node_weight(edge.target())
                .map(|r| r.id.as_str())
                .unwrap_or("?");

            let style = match edge.weight() {
                DependencyKind::Containment => "solid",
                DependencyKind::Attachment => "dashed",
                DependencyKind::Routing => "bold",
                DependencyKind::Security => "dotted",
                DependencyKind::Placement => "solid",
            };

            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [style={}, label=\"{}\"];\n",
                source,
                target,
                style,
                edge.weight()
            ));
        }

        output.push_str("}\n");
        output
    }

    /// Edges as `(dependency, dependent, kind)` triples, in insertion order.
    pub(crate) fn edges(&self) -> Vec<(String, String, DependencyKind)> {
        self.graph
            .edge_references()
            .filter_map(|edge| {
                let from = self.graph.node_weight(edge.source())?;
                let to = self.graph.node_weight(edge.target())?;
                Some((from.id.clone(), to.id.clone(), *edge.weight()))
            })
            .collect()
    }
}

/// Carves each declared subnet's block out of the network block, in
/// declaration order, aligning each block to its natural boundary.
fn carve_subnets(network: &NetworkDecl) -> Result<Vec<(&str, Cidr)>> {
    let base = u64::from(u32::from(network.cidr.network()));
    let end = u64::from(u32::from(network.cidr.broadcast())) + 1;
    let mut cursor = base;
    let mut carved = Vec::with_capacity(network.subnets.len());

    for subnet in &network.subnets {
        if subnet.prefix_len <= network.cidr.prefix_len() {
            return Err(Error::SubnetExhausted {
                network: network.id.clone(),
                cidr: network.cidr.to_string(),
                subnet: subnet.id.clone(),
                prefix_len: subnet.prefix_len,
            });
        }
        let size = 1u64 << (32 - subnet.prefix_len);
        let aligned = cursor.div_ceil(size) * size;
        if aligned + size > end {
            return Err(Error::SubnetExhausted {
                network: network.id.clone(),
                cidr: network.cidr.to_string(),
                subnet: subnet.id.clone(),
                prefix_len: subnet.prefix_len,
            });
        }
        let block = Cidr::new(Ipv4Addr::from(aligned as u32), subnet.prefix_len)?;
        carved.push((subnet.id.as_str(), block));
        cursor = aligned + size;
    }

    Ok(carved)
}

fn subnet_tier(network: &NetworkDecl, subnet_id: &str) -> SubnetTier {
    network
        .subnets
        .iter()
        .find(|s| s.id == subnet_id)
        .map(|s| s.tier)
        .unwrap_or(SubnetTier::Public)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    fn two_network_manifest() -> Manifest {
        let yaml = r#"
name: pair
networks:
  - id: net-a
    cidr: 192.0.2.0/24
    nat_gateways: 1
    subnets:
      - id: net-a-public
        tier: public
      - id: net-a-private
        tier: private
  - id: net-b
    cidr: 198.51.100.0/24
    subnets:
      - id: net-b-public
        tier: public
peerings:
  - id: a-to-b
    requester: net-a
    accepter: net-b
"#;
        Manifest::from_yaml(yaml, None).unwrap()
    }

    #[test]
    fn test_subnet_carving_is_sequential() {
        let graph = ResourceGraph::from_manifest(&two_network_manifest()).unwrap();
        let public = graph.get("net-a-public").unwrap();
        let private = graph.get("net-a-private").unwrap();
        let ResourceSpec::Subnet(public) = &public.spec else {
            panic!("expected subnet");
        };
        let ResourceSpec::Subnet(private) = &private.spec else {
            panic!("expected subnet");
        };
        assert_eq!(public.cidr.to_string(), "192.0.2.0/28");
        assert_eq!(private.cidr.to_string(), "192.0.2.16/28");
    }

    #[test]
    fn test_peering_synthesizes_public_routes_both_ways() {
        let graph = ResourceGraph::from_manifest(&two_network_manifest()).unwrap();
        let routes: Vec<&Resource> = graph.resources_of_kind(ResourceKind::Route).collect();
        assert_eq!(routes.len(), 2);
        assert!(graph.contains("net-a-public-via-a-to-b"));
        assert!(graph.contains("net-b-public-via-a-to-b"));

        let ResourceSpec::Route(route) = &graph.get("net-a-public-via-a-to-b").unwrap().spec
        else {
            panic!("expected route");
        };
        assert_eq!(route.destination.to_string(), "198.51.100.0/24");
        assert_eq!(route.via_peering, "a-to-b");
    }

    #[test]
    fn test_creation_order_respects_dependencies() {
        let graph = ResourceGraph::from_manifest(&two_network_manifest()).unwrap();
        let order = graph.creation_order().unwrap();
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        assert!(pos("net-a") < pos("net-a-public"));
        assert!(pos("net-a") < pos("a-to-b"));
        assert!(pos("net-b") < pos("a-to-b"));
        assert!(pos("a-to-b") < pos("net-a-public-via-a-to-b"));
        assert!(pos("net-a-public") < pos("net-a-public-via-a-to-b"));
    }

    #[test]
    fn test_destruction_order_is_reversed() {
        let graph = ResourceGraph::from_manifest(&two_network_manifest()).unwrap();
        let mut creation = graph.creation_order().unwrap();
        creation.reverse();
        assert_eq!(graph.destruction_order().unwrap(), creation);
    }

    #[test]
    fn test_unknown_peering_network_is_rejected() {
        let yaml = r#"
name: broken
networks:
  - id: net-a
    cidr: 192.0.2.0/24
peerings:
  - id: a-to-b
    requester: net-a
    accepter: net-missing
"#;
        let manifest = Manifest::from_yaml(yaml, None).unwrap();
        assert!(matches!(
            ResourceGraph::from_manifest(&manifest),
            Err(Error::UnknownReference { target, .. }) if target == "net-missing"
        ));
    }

    #[test]
    fn test_subnet_exhaustion_is_rejected() {
        let yaml = r#"
name: tight
networks:
  - id: net-a
    cidr: 192.0.2.0/28
    subnets:
      - id: s-one
        tier: public
        prefix_len: 29
      - id: s-two
        tier: public
        prefix_len: 29
      - id: s-three
        tier: public
        prefix_len: 29
"#;
        let manifest = Manifest::from_yaml(yaml, None).unwrap();
        assert!(matches!(
            ResourceGraph::from_manifest(&manifest),
            Err(Error::SubnetExhausted { subnet, .. }) if subnet == "s-three"
        ));
    }

    #[test]
    fn test_cycle_detection_on_hand_built_graph() {
        let mut graph = ResourceGraph::new();
        for id in ["one", "two", "three"] {
            graph
                .add_resource(Resource::new(
                    id,
                    ResourceSpec::Peering(PeeringSpec {
                        requester: "x".into(),
                        accepter: "y".into(),
                    }),
                ))
                .unwrap();
        }
        graph.add_dependency("one", "two", DependencyKind::Attachment).unwrap();
        graph.add_dependency("two", "three", DependencyKind::Attachment).unwrap();
        assert!(!graph.has_cycles());

        graph.add_dependency("three", "one", DependencyKind::Attachment).unwrap();
        assert!(graph.has_cycles());
        assert!(graph.creation_order().is_err());
        assert_eq!(graph.cycles().len(), 1);
    }

    #[test]
    fn test_transitive_dependents() {
        let graph = ResourceGraph::from_manifest(&two_network_manifest()).unwrap();
        let dependents = graph.dependents_of("a-to-b");
        assert!(dependents.contains(&"net-a-public-via-a-to-b".to_string()));
        assert!(dependents.contains(&"net-b-public-via-a-to-b".to_string()));

        let deps = graph.dependencies_of("net-a-public-via-a-to-b");
        assert!(deps.contains(&"a-to-b".to_string()));
        assert!(deps.contains(&"net-a".to_string()));
        assert!(deps.contains(&"net-b".to_string()));
    }

    #[test]
    fn test_to_dot_contains_nodes_and_edges() {
        let graph = ResourceGraph::from_manifest(&two_network_manifest()).unwrap();
        let dot = graph.to_dot();
        assert!(dot.contains("digraph"));
        assert!(dot.contains("net-a"));
        assert!(dot.contains("->"));
    }
}
