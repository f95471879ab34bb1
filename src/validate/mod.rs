//! Structural validation of resource graphs.
//!
//! Every rule inspects the resolved graph and appends violations to a
//! [`ValidationReport`]. Rules cover the configuration-validity properties
//! of a topology: non-overlapping network blocks, routes that resolve to
//! declared peerings, endpoints and instances placed in subnets of their
//! own network, and security group rules scoped to declared address
//! ranges.
//!
//! # Example
//!
//! ```rust,ignore
//! use netforge::validate;
//!
//! let report = validate::validate(&graph);
//! for violation in report.violations() {
//!     println!("{violation}");
//! }
//! report.into_result()?;
//! ```

mod rules;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{
    InterfaceEndpointSpec, NetworkSpec, PeeringSpec, ResourceGraph, ResourceSpec, RouteSpec,
    SubnetSpec,
};

/// Severity of a validation violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but not fatal.
    Warning,
    /// Definite problem; the topology must not be applied.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single rule violation.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    /// Severity level
    pub severity: Severity,
    /// Rule code (stable, machine-readable)
    pub rule: &'static str,
    /// Resource the violation is attached to
    pub resource: String,
    /// Human-readable message
    pub message: String,
}

impl Violation {
    fn error(rule: &'static str, resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            rule,
            resource: resource.into(),
            message: message.into(),
        }
    }

    fn warning(
        rule: &'static str,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            rule,
            resource: resource.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity, self.rule, self.resource, self.message
        )
    }
}

/// The collected outcome of a validation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// All violations, in detection order.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    /// Number of error-severity violations.
    pub fn error_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
            .count()
    }

    /// Number of warning-severity violations.
    pub fn warning_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Warning)
            .count()
    }

    /// Whether any error-severity violation was recorded.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Whether the report is empty.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Converts the report into a result, failing on errors.
    pub fn into_result(self) -> Result<()> {
        if self.has_errors() {
            Err(Error::ValidationFailed {
                errors: self.error_count(),
                warnings: self.warning_count(),
            })
        } else {
            Ok(())
        }
    }
}

/// An indexed view over the graph's typed resources, shared by the rules.
pub(crate) struct Topology<'a> {
    pub graph: &'a ResourceGraph,
    pub networks: HashMap<&'a str, &'a NetworkSpec>,
    pub subnets: HashMap<&'a str, &'a SubnetSpec>,
    pub peerings: HashMap<&'a str, &'a PeeringSpec>,
    pub routes: HashMap<&'a str, &'a RouteSpec>,
    pub endpoints: HashMap<&'a str, &'a InterfaceEndpointSpec>,
}

impl<'a> Topology<'a> {
    fn index(graph: &'a ResourceGraph) -> Self {
        let mut topology = Self {
            graph,
            networks: HashMap::new(),
            subnets: HashMap::new(),
            peerings: HashMap::new(),
            routes: HashMap::new(),
            endpoints: HashMap::new(),
        };
        for resource in graph.resources() {
            let id = resource.id.as_str();
            match &resource.spec {
                ResourceSpec::Network(spec) => {
                    topology.networks.insert(id, spec);
                }
                ResourceSpec::Subnet(spec) => {
                    topology.subnets.insert(id, spec);
                }
                ResourceSpec::Peering(spec) => {
                    topology.peerings.insert(id, spec);
                }
                ResourceSpec::Route(spec) => {
                    topology.routes.insert(id, spec);
                }
                ResourceSpec::InterfaceEndpoint(spec) => {
                    topology.endpoints.insert(id, spec);
                }
                _ => {}
            }
        }
        topology
    }
}

/// Runs every rule against the graph and returns the collected report.
pub fn validate(graph: &ResourceGraph) -> ValidationReport {
    let topology = Topology::index(graph);
    let mut report = ValidationReport::new();

    rules::check_network_overlap(&topology, &mut report);
    rules::check_subnet_fit(&topology, &mut report);
    rules::check_peering_shape(&topology, &mut report);
    rules::check_route_peering(&topology, &mut report);
    rules::check_endpoint_subnets(&topology, &mut report);
    rules::check_instance_placement(&topology, &mut report);
    rules::check_security_group_scope(&topology, &mut report);

    tracing::debug!(
        errors = report.error_count(),
        warnings = report.warning_count(),
        "validation finished"
    );
    report
}
