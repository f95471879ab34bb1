//! Synthesis document: the serialized form of a resource graph.
//!
//! The document is the contract handed to external consumers: nodes carry
//! typed resource properties, edges carry declared dependencies. Resources
//! are listed in creation order so a consumer can apply them top to bottom.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::{DependencyKind, ResourceGraph, ResourceSpec};

/// Current synthesis document format version.
pub const FORMAT_VERSION: u32 = 1;

/// A serializable snapshot of a resource graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthDocument {
    /// Document format version
    pub format_version: u32,

    /// Topology name
    pub topology: String,

    /// Resources in creation order
    pub resources: Vec<ResourceEntry>,

    /// Dependency edges
    pub dependencies: Vec<DependencyEntry>,
}

/// One resource node in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Resource id
    pub id: String,

    /// Typed properties (tagged with the resource kind)
    #[serde(flatten)]
    pub spec: ResourceSpec,
}

/// One dependency edge in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEntry {
    /// The dependency (must exist first)
    pub from: String,

    /// The dependent
    pub to: String,

    /// Why the dependent needs the dependency
    pub kind: DependencyKind,
}

impl SynthDocument {
    /// Builds a document from a graph, ordering resources for creation.
    pub fn from_graph(topology: impl Into<String>, graph: &ResourceGraph) -> Result<Self> {
        let order = graph.creation_order()?;
        let resources = order
            .iter()
            .filter_map(|id| graph.get(id))
            .map(|resource| ResourceEntry {
                id: resource.id.clone(),
                spec: resource.spec.clone(),
            })
            .collect();

        let dependencies = graph
            .edges()
            .into_iter()
            .map(|(from, to, kind)| DependencyEntry { from, to, kind })
            .collect();

        Ok(Self {
            format_version: FORMAT_VERSION,
            topology: topology.into(),
            resources,
            dependencies,
        })
    }

    /// Serializes the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    #[test]
    fn test_document_orders_resources_for_creation() {
        let yaml = r#"
name: doc
networks:
  - id: net-a
    cidr: 10.0.0.0/16
    subnets:
      - id: net-a-public
        tier: public
"#;
        let manifest = Manifest::from_yaml(yaml, None).unwrap();
        let graph = ResourceGraph::from_manifest(&manifest).unwrap();
        let doc = graph.to_document("doc").unwrap();

        assert_eq!(doc.format_version, FORMAT_VERSION);
        assert_eq!(doc.resources.len(), 2);
        assert_eq!(doc.resources[0].id, "net-a");
        assert_eq!(doc.resources[1].id, "net-a-public");
        assert_eq!(doc.dependencies.len(), 1);

        let json = doc.to_json_pretty().unwrap();
        assert!(json.contains("\"kind\": \"subnet\""));

        let back: SynthDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.resources.len(), 2);
    }
}
