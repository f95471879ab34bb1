//! Error types for Netforge.
//!
//! This module defines the error types used throughout Netforge, providing
//! rich error information for debugging and user feedback.

use std::path::PathBuf;
use thiserror::Error;

use crate::cidr::CidrError;
use crate::state::StateError;

/// Result type alias for Netforge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Netforge.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Manifest Errors
    // ========================================================================
    /// Error parsing a topology manifest file.
    #[error("Failed to parse manifest '{path}': {message}")]
    ManifestParse {
        /// Path to the manifest file
        path: PathBuf,
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error validating manifest structure.
    #[error("Manifest validation failed: {0}")]
    ManifestValidation(String),

    // ========================================================================
    // Graph Errors
    // ========================================================================
    /// A declaration references a resource that does not exist in the graph.
    #[error("Resource '{resource}' references unknown {field} '{target}'")]
    UnknownReference {
        /// The referring resource id
        resource: String,
        /// Which field held the reference
        field: String,
        /// The missing target id
        target: String,
    },

    /// Two declarations share the same resource id.
    #[error("Duplicate resource id '{0}'")]
    DuplicateResource(String),

    /// The dependency graph contains a cycle.
    #[error("Dependency cycle detected: {0}")]
    DependencyCycle(String),

    /// A network block cannot hold the subnets carved from it.
    #[error("Network '{network}' ({cidr}) cannot fit subnet '{subnet}' (/{prefix_len})")]
    SubnetExhausted {
        /// The parent network id
        network: String,
        /// The parent network block
        cidr: String,
        /// The subnet that did not fit
        subnet: String,
        /// Requested prefix length
        prefix_len: u8,
    },

    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Structural validation of the resource graph found errors.
    #[error("Validation failed with {errors} error(s) and {warnings} warning(s)")]
    ValidationFailed {
        /// Number of error-severity violations
        errors: usize,
        /// Number of warning-severity violations
        warnings: usize,
    },

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// Applying a plan step failed.
    #[error("Failed to apply '{resource}': {message}")]
    ApplyFailed {
        /// Resource id of the failed step
        resource: String,
        /// Error message
        message: String,
    },

    /// A deploy run was aborted after a step failure.
    #[error("Deployment '{deployment}' aborted: {applied} step(s) applied, {failed} failed")]
    DeploymentAborted {
        /// Deployment name
        deployment: String,
        /// Steps applied before the abort
        applied: usize,
        /// Failed steps
        failed: usize,
    },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// State store error.
    #[error(transparent)]
    State(#[from] StateError),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// CIDR notation error.
    #[error(transparent)]
    Cidr(#[from] CidrError),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Template error.
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new manifest parse error.
    pub fn manifest_parse(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ManifestParse {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Creates a new unknown reference error.
    pub fn unknown_reference(
        resource: impl Into<String>,
        field: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::UnknownReference {
            resource: resource.into(),
            field: field.into(),
            target: target.into(),
        }
    }

    /// Creates a new apply failed error.
    pub fn apply_failed(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ApplyFailed {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ApplyFailed { .. } | Error::DeploymentAborted { .. } => 2,
            Error::ManifestParse { .. }
            | Error::ManifestValidation(_)
            | Error::ValidationFailed { .. }
            | Error::UnknownReference { .. }
            | Error::DuplicateResource(_)
            | Error::DependencyCycle(_)
            | Error::SubnetExhausted { .. }
            | Error::Cidr(_)
            | Error::YamlParse(_)
            | Error::Template(_) => 4,
            Error::State(_) => 5,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
