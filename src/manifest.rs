//! Topology manifest definitions and parsing.
//!
//! A manifest is the declarative YAML document describing the network
//! topology to provision: network containers with their subnet partitions,
//! peering connections, service endpoints, routes, security groups, and
//! compute instances. Manifests support `{{ var }}` interpolation from
//! their own `vars` block.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::cidr::Cidr;
use crate::error::{Error, Result};
use crate::template;

/// Resource ids: lowercase alphanumerics and dashes, starting with a letter.
static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("id pattern is valid"));

/// A topology manifest.
///
/// Manifests are the top-level configuration files in Netforge. Every
/// resource declaration carries a manifest-unique id that other
/// declarations refer to by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Name of the topology
    pub name: String,

    /// Variables available for `{{ var }}` interpolation
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub vars: IndexMap<String, serde_yaml::Value>,

    /// Network containers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<NetworkDecl>,

    /// Peering connections between network containers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peerings: Vec<PeeringDecl>,

    /// Interface endpoints for private service access
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<EndpointDecl>,

    /// Explicit route table entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteDecl>,

    /// Security groups
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<SecurityGroupDecl>,

    /// Compute instances
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<InstanceDecl>,

    /// Path to the manifest file (set during loading)
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Manifest {
    /// Loads a manifest from a YAML file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::manifest_parse(path, format!("Failed to read file: {e}"), None)
        })?;

        Self::from_yaml(&content, Some(path.to_path_buf()))
    }

    /// Parses a manifest from a YAML string.
    ///
    /// When the document declares `vars` or contains template markers, the
    /// whole document is rendered through the template engine before the
    /// final parse.
    pub fn from_yaml(yaml: &str, source_path: Option<PathBuf>) -> Result<Self> {
        let rendered;
        let body = if yaml.contains("{{") || yaml.contains("{%") {
            let probe: VarsProbe = serde_yaml::from_str(yaml).map_err(|e| {
                Error::manifest_parse(
                    source_path.clone().unwrap_or_else(|| "<string>".into()),
                    e.to_string(),
                    None,
                )
            })?;
            rendered = template::render(yaml, &probe.vars)?;
            rendered.as_str()
        } else {
            yaml
        };

        let mut manifest: Manifest = serde_yaml::from_str(body).map_err(|e| {
            Error::manifest_parse(
                source_path.clone().unwrap_or_else(|| "<string>".into()),
                e.to_string(),
                None,
            )
        })?;
        manifest.source_path = source_path;
        Ok(manifest)
    }

    /// Validates the manifest structure: non-empty name, well-formed ids,
    /// no duplicate ids, and at least one network declaration.
    ///
    /// Cross-resource semantics (reference resolution, address math) are
    /// checked by the graph builder and the validation rules, not here.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::ManifestValidation(
                "Manifest must have a name".to_string(),
            ));
        }
        if self.networks.is_empty() {
            return Err(Error::ManifestValidation(
                "Manifest must declare at least one network".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for id in self.declared_ids() {
            if !ID_PATTERN.is_match(id) {
                return Err(Error::ManifestValidation(format!(
                    "Invalid resource id '{id}': expected lowercase letters, digits, and dashes"
                )));
            }
            if !seen.insert(id) {
                return Err(Error::DuplicateResource(id.to_string()));
            }
        }

        for network in &self.networks {
            for subnet in &network.subnets {
                if subnet.prefix_len > 32 {
                    return Err(Error::ManifestValidation(format!(
                        "Subnet '{}' has invalid prefix length {}",
                        subnet.id, subnet.prefix_len
                    )));
                }
            }
        }

        Ok(())
    }

    /// Iterates over every declared resource id, in declaration order.
    pub fn declared_ids(&self) -> impl Iterator<Item = &str> {
        let network_scoped = self.networks.iter().flat_map(|n| {
            std::iter::once(n.id.as_str())
                .chain(n.subnets.iter().map(|s| s.id.as_str()))
                .chain(n.gateway_endpoints.iter().map(|g| g.id.as_str()))
        });
        network_scoped
            .chain(self.peerings.iter().map(|p| p.id.as_str()))
            .chain(self.endpoints.iter().map(|e| e.id.as_str()))
            .chain(self.routes.iter().map(|r| r.id.as_str()))
            .chain(self.security_groups.iter().map(|s| s.id.as_str()))
            .chain(self.instances.iter().map(|i| i.id.as_str()))
    }

    /// Total number of declared resources.
    pub fn resource_count(&self) -> usize {
        self.declared_ids().count()
    }
}

/// A network container (an isolated address space partitioned into subnets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDecl {
    /// Manifest-unique id
    pub id: String,

    /// Address block of the container
    pub cidr: Cidr,

    /// Whether DNS resolution is enabled inside the container
    #[serde(default = "default_true")]
    pub dns_support: bool,

    /// Whether instances receive DNS hostnames
    #[serde(default = "default_true")]
    pub dns_hostnames: bool,

    /// Number of NAT gateways serving private-tier subnets
    #[serde(default)]
    pub nat_gateways: u8,

    /// Subnet partitions, carved out of `cidr` in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<SubnetDecl>,

    /// Gateway endpoints attached to the container's route tables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gateway_endpoints: Vec<GatewayEndpointDecl>,
}

/// A subnet partition within a network container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetDecl {
    /// Manifest-unique id
    pub id: String,

    /// Placement tier
    pub tier: SubnetTier,

    /// Prefix length of the carved block
    #[serde(default = "default_subnet_prefix")]
    pub prefix_len: u8,
}

/// Subnet placement tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetTier {
    /// Routable from outside the container
    Public,
    /// Outbound access through a NAT gateway only
    Private,
    /// No route outside the container
    Isolated,
}

impl fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetTier::Public => write!(f, "public"),
            SubnetTier::Private => write!(f, "private"),
            SubnetTier::Isolated => write!(f, "isolated"),
        }
    }
}

/// A gateway endpoint: private access to a provider service wired into the
/// container's route tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEndpointDecl {
    /// Manifest-unique id
    pub id: String,

    /// Service identifier (free-form, provider-neutral)
    pub service: String,
}

/// A peering connection between two network containers.
///
/// The graph builder synthesizes routes in both directions for every subnet
/// whose tier is listed in `route_tiers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeeringDecl {
    /// Manifest-unique id
    pub id: String,

    /// Requesting network id
    pub requester: String,

    /// Accepting network id
    pub accepter: String,

    /// Subnet tiers to wire with routes across the peering
    #[serde(default = "default_route_tiers")]
    pub route_tiers: Vec<SubnetTier>,
}

/// An interface endpoint: a private access path from subnets to a provider
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDecl {
    /// Manifest-unique id
    pub id: String,

    /// Service identifier (free-form, provider-neutral)
    pub service: String,

    /// Network the endpoint lives in
    pub network: String,

    /// Subnets the endpoint places interfaces into
    pub subnets: Vec<String>,
}

/// An explicit route table entry sending traffic across a peering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecl {
    /// Manifest-unique id
    pub id: String,

    /// Subnet whose route table receives the entry
    pub subnet: String,

    /// Destination block
    pub destination: Cidr,

    /// Peering connection carrying the traffic
    pub via_peering: String,
}

/// A security group scoped to one network container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityGroupDecl {
    /// Manifest-unique id
    pub id: String,

    /// Network the group is scoped to
    pub network: String,

    /// Whether all outbound traffic is permitted
    #[serde(default = "default_true")]
    pub allow_all_outbound: bool,

    /// Ingress rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<IngressRule>,
}

/// A single ingress rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    /// Source address block the rule admits
    pub source_cidr: Cidr,

    /// Admitted protocol
    #[serde(default)]
    pub protocol: Protocol,
}

/// Protocols an ingress rule can admit.
///
/// Serialized in compact string form: `all`, `icmp`, `tcp/22`,
/// `tcp/1000-2000`, `udp/53`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Any protocol
    All,
    /// ICMP (ping)
    Icmp,
    /// TCP over a port range
    Tcp {
        /// First admitted port
        from: u16,
        /// Last admitted port
        to: u16,
    },
    /// UDP over a port range
    Udp {
        /// First admitted port
        from: u16,
        /// Last admitted port
        to: u16,
    },
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::All
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::All => write!(f, "all"),
            Protocol::Icmp => write!(f, "icmp"),
            Protocol::Tcp { from, to } if from == to => write!(f, "tcp/{from}"),
            Protocol::Tcp { from, to } => write!(f, "tcp/{from}-{to}"),
            Protocol::Udp { from, to } if from == to => write!(f, "udp/{from}"),
            Protocol::Udp { from, to } => write!(f, "udp/{from}-{to}"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => return Ok(Protocol::All),
            "icmp" => return Ok(Protocol::Icmp),
            _ => {}
        }
        let (proto, ports) = s
            .split_once('/')
            .ok_or_else(|| format!("invalid protocol '{s}'"))?;
        let (from, to) = match ports.split_once('-') {
            Some((a, b)) => (
                a.parse().map_err(|_| format!("invalid port in '{s}'"))?,
                b.parse().map_err(|_| format!("invalid port in '{s}'"))?,
            ),
            None => {
                let port: u16 = ports.parse().map_err(|_| format!("invalid port in '{s}'"))?;
                (port, port)
            }
        };
        if from > to {
            return Err(format!("inverted port range in '{s}'"));
        }
        match proto {
            "tcp" => Ok(Protocol::Tcp { from, to }),
            "udp" => Ok(Protocol::Udp { from, to }),
            other => Err(format!("unknown protocol '{other}'")),
        }
    }
}

impl Serialize for Protocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Protocol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A compute instance placed in a subnet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDecl {
    /// Manifest-unique id
    pub id: String,

    /// Subnet the instance is placed in
    pub subnet: String,

    /// Security group attached to the instance
    pub security_group: String,

    /// Machine size (free-form, provider-neutral)
    #[serde(default = "default_machine")]
    pub machine: String,

    /// Root volume size in GiB
    #[serde(default = "default_root_volume")]
    pub root_volume_gib: u32,
}

/// Minimal document view used to extract `vars` before template rendering.
#[derive(Debug, Deserialize)]
struct VarsProbe {
    #[serde(default)]
    vars: IndexMap<String, serde_yaml::Value>,
}

fn default_true() -> bool {
    true
}

fn default_subnet_prefix() -> u8 {
    28
}

fn default_route_tiers() -> Vec<SubnetTier> {
    vec![SubnetTier::Public]
}

fn default_machine() -> String {
    "t3.micro".to_string()
}

fn default_root_volume() -> u32 {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_manifest() {
        let yaml = r#"
name: minimal
networks:
  - id: net-a
    cidr: 10.0.0.0/16
    subnets:
      - id: net-a-public
        tier: public
"#;
        let manifest = Manifest::from_yaml(yaml, None).unwrap();
        assert_eq!(manifest.name, "minimal");
        assert_eq!(manifest.networks.len(), 1);
        let net = &manifest.networks[0];
        assert!(net.dns_support);
        assert_eq!(net.nat_gateways, 0);
        assert_eq!(net.subnets[0].prefix_len, 28);
        assert_eq!(net.subnets[0].tier, SubnetTier::Public);
        manifest.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let yaml = r#"
name: dup
networks:
  - id: net-a
    cidr: 10.0.0.0/16
    subnets:
      - id: net-a
        tier: public
"#;
        let manifest = Manifest::from_yaml(yaml, None).unwrap();
        assert!(matches!(
            manifest.validate(),
            Err(Error::DuplicateResource(id)) if id == "net-a"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_id() {
        let yaml = r#"
name: bad
networks:
  - id: Net_A
    cidr: 10.0.0.0/16
"#;
        let manifest = Manifest::from_yaml(yaml, None).unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_template_interpolation() {
        let yaml = r#"
name: templated
vars:
  machine: t3.large
networks:
  - id: net-a
    cidr: 10.0.0.0/16
    subnets:
      - id: net-a-public
        tier: public
instances:
  - id: host
    subnet: net-a-public
    security_group: sg
    machine: "{{ machine }}"
"#;
        let manifest = Manifest::from_yaml(yaml, None).unwrap();
        assert_eq!(manifest.instances[0].machine, "t3.large");
    }

    #[test]
    fn test_protocol_string_forms() {
        assert_eq!("icmp".parse::<Protocol>().unwrap(), Protocol::Icmp);
        assert_eq!(
            "tcp/22".parse::<Protocol>().unwrap(),
            Protocol::Tcp { from: 22, to: 22 }
        );
        assert_eq!(
            "udp/1000-2000".parse::<Protocol>().unwrap(),
            Protocol::Udp {
                from: 1000,
                to: 2000
            }
        );
        assert!("tcp/9-1".parse::<Protocol>().is_err());
        assert!("gre/1".parse::<Protocol>().is_err());
        assert_eq!(Protocol::Tcp { from: 22, to: 22 }.to_string(), "tcp/22");
    }
}
