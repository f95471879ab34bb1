//! Deployment state tracking.
//!
//! The engine records every applied resource in a per-deployment state
//! document: its resolved properties, its dependencies, and the uid the
//! provisioning run assigned to it. The planner diffs the desired graph
//! against this state to decide what to create, update, replace, or
//! delete.
//!
//! State is persisted as one JSON document per deployment (see
//! [`JsonStateStore`]). There is no locking: concurrent runs against the
//! same deployment are the operator's responsibility.

pub mod persistence;

pub use persistence::JsonStateStore;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::ResourceKind;

/// Errors that can occur during state operations.
#[derive(Error, Debug)]
pub enum StateError {
    /// No state document exists for the deployment.
    #[error("Deployment '{0}' not found in state store")]
    DeploymentNotFound(String),

    /// A state document exists but cannot be read.
    #[error("Corrupt state document '{path}': {message}")]
    Corrupt {
        /// Path of the document
        path: String,
        /// What went wrong
        message: String,
    },

    /// A record the engine expected to update is missing.
    #[error("Resource '{0}' is not recorded in state")]
    RecordNotFound(String),

    /// Serialization error.
    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("State IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for state operations.
pub type StateResult<T> = std::result::Result<T, StateError>;

/// One applied resource, as recorded in a deployment's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Resource id (manifest-unique)
    pub id: String,

    /// Resource kind
    pub kind: ResourceKind,

    /// Uid assigned at apply time
    pub uid: String,

    /// Resolved properties, as canonical JSON
    pub spec: serde_json::Value,

    /// Direct dependency ids at apply time
    pub dependencies: Vec<String>,

    /// When the resource was first applied
    pub created_at: DateTime<Utc>,

    /// When the resource was last updated
    pub updated_at: DateTime<Utc>,
}

/// The recorded state of one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentState {
    /// Deployment name
    pub name: String,

    /// Monotonically increasing revision, bumped on every save
    pub serial: u64,

    /// When the deployment was first created
    pub created_at: DateTime<Utc>,

    /// When the deployment was last written
    pub updated_at: DateTime<Utc>,

    /// Applied resources, in apply order
    resources: IndexMap<String, ResourceRecord>,
}

impl DeploymentState {
    /// Creates an empty deployment state.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            serial: 0,
            created_at: now,
            updated_at: now,
            resources: IndexMap::new(),
        }
    }

    /// Looks up a record by resource id.
    pub fn get(&self, id: &str) -> Option<&ResourceRecord> {
        self.resources.get(id)
    }

    /// Whether a record exists for the resource id.
    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// Inserts or replaces a record.
    pub fn upsert(&mut self, record: ResourceRecord) {
        self.resources.insert(record.id.clone(), record);
    }

    /// Removes a record, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<ResourceRecord> {
        self.resources.shift_remove(id)
    }

    /// Iterates over the records in apply order.
    pub fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.resources.values()
    }

    /// The recorded resource ids, in apply order.
    pub fn record_ids(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Number of recorded resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resources are recorded.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Marks the state as written: bumps the serial and the timestamp.
    pub fn touch(&mut self) {
        self.serial += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> ResourceRecord {
        let now = Utc::now();
        ResourceRecord {
            id: id.to_string(),
            kind: ResourceKind::Network,
            uid: format!("uid-{id}"),
            spec: serde_json::json!({"cidr": "10.0.0.0/16"}),
            dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_upsert_and_lookup() {
        let mut state = DeploymentState::new("demo");
        assert!(state.is_empty());

        state.upsert(record("net-a"));
        assert!(state.contains("net-a"));
        assert_eq!(state.len(), 1);
        assert_eq!(state.get("net-a").unwrap().uid, "uid-net-a");
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut state = DeploymentState::new("demo");
        state.upsert(record("one"));
        state.upsert(record("two"));
        state.upsert(record("three"));

        state.remove("two");
        let ids: Vec<&str> = state.record_ids().collect();
        assert_eq!(ids, vec!["one", "three"]);
    }

    #[test]
    fn test_touch_bumps_serial() {
        let mut state = DeploymentState::new("demo");
        assert_eq!(state.serial, 0);
        state.touch();
        state.touch();
        assert_eq!(state.serial, 2);
    }
}
