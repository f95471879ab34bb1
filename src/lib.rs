//! # Netforge - A Declarative Network-Topology Provisioning Engine
//!
//! Netforge turns a declarative YAML description of a network topology -
//! network containers, subnet partitions, peering connections, service
//! endpoints, routes, security groups, and compute instances - into a
//! typed resource dependency graph, validates it, plans the changes
//! against recorded deployment state, and applies or destroys the plan.
//!
//! ## Core Concepts
//!
//! - **Manifests**: YAML-defined topology descriptions with variable
//!   interpolation
//! - **Resource graph**: typed resources plus the dependency edges the
//!   planner must respect
//! - **Validation**: structural rules over the resolved graph (address
//!   overlap, reference resolution, security scoping)
//! - **Plans**: ordered create/update/replace/delete steps computed by
//!   diffing the graph against recorded state
//! - **Engine**: applies plans in dependency waves and records outcomes in
//!   a JSON state store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                              │
//! │                    (clap-based command parsing)                      │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Manifest + Templates                           │
//! │               (YAML parsing, var interpolation)                      │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Resource Graph Builder                          │
//! │         (subnet carving, route synthesis, dependency edges)          │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!          ┌─────────────────────────┼─────────────────────────┐
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │    Validation   │   │      Planner        │   │    Synthesis doc    │
//! │  (rule engine)  │   │  (state diffing)    │   │    (JSON / DOT)     │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                             Engine                                   │
//! │          (dependency waves, concurrent apply, state store)           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use netforge::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manifest = Manifest::from_file("topology.yaml").await?;
//!     let graph = ResourceGraph::from_manifest(&manifest)?;
//!
//!     validate::validate(&graph).into_result()?;
//!
//!     let store = JsonStateStore::new(".netforge/state")?;
//!     let state = store.load_or_new(&manifest.name)?;
//!     let plan = plan::plan(&manifest.name, &graph, &state)?;
//!
//!     let engine = Engine::new(store);
//!     let report = engine.apply(&graph, &plan, &NullSink).await?;
//!     println!("applied {} resources", report.applied_count());
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    // Error handling
    pub use crate::error::{Error, ErrorContext, Result};

    // Address math
    pub use crate::cidr::Cidr;

    // Manifests
    pub use crate::manifest::{Manifest, Protocol, SubnetTier};

    // Resource graph
    pub use crate::graph::{
        DependencyKind, Resource, ResourceGraph, ResourceKind, ResourceSpec, SynthDocument,
    };

    // Validation
    pub use crate::validate::{self, Severity, ValidationReport, Violation};

    // Planning
    pub use crate::plan::{self, Plan, PlanStep, StepAction};

    // State
    pub use crate::state::{DeploymentState, JsonStateStore, ResourceRecord};

    // Engine
    pub use crate::engine::{DeployReport, Engine, EventSink, NullSink, StepOutcome, StepStatus};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases for Netforge operations.
pub mod error;

/// IPv4 CIDR block arithmetic used by the graph builder and validators.
pub mod cidr;

/// Topology manifest parsing and representation.
///
/// This module handles loading, parsing, and representing YAML manifests,
/// including `{{ var }}` interpolation from the manifest's `vars` block.
pub mod manifest;

/// Manifest template rendering.
pub mod template;

// ============================================================================
// Graph, Validation, and Planning
// ============================================================================

/// Resource dependency graph builder and synthesis documents.
///
/// Resolves a manifest into typed resource nodes and dependency edges:
/// subnet blocks are carved from their network blocks, peering routes are
/// synthesized, and topological orderings for creation and destruction are
/// derived with petgraph.
pub mod graph;

/// Structural validation rules over resolved resource graphs.
pub mod validate;

/// Change planning: diffing a desired graph against recorded state.
pub mod plan;

// ============================================================================
// Execution
// ============================================================================

/// Deployment state tracking and JSON persistence.
pub mod state;

/// Plan execution engine with dependency-wave concurrency.
pub mod engine;

// ============================================================================
// Interface
// ============================================================================

/// Configuration management for Netforge behavior.
pub mod config;

/// Command-line interface: argument parsing, subcommands, and output
/// formatting.
pub mod cli;

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of Netforge.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
