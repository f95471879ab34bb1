//! Subcommand implementations.

pub mod deploy;
pub mod destroy;
pub mod list;
pub mod plan;
pub mod synth;
pub mod validate;

use std::path::{Path, PathBuf};

use crate::cli::output::OutputFormatter;
use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::manifest::Manifest;

/// Shared context handed to every subcommand.
pub struct CommandContext {
    /// Output formatter
    pub output: OutputFormatter,
    /// Loaded configuration
    pub config: Config,
    /// Requested output format
    pub format: OutputFormat,
    /// Effective state directory
    pub state_dir: PathBuf,
}

impl CommandContext {
    /// Builds the context from parsed arguments and configuration.
    pub fn new(cli: &Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.colors.enabled;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());
        let state_dir = cli
            .state_dir
            .clone()
            .unwrap_or_else(|| config.defaults.state_dir.clone());

        Self {
            output,
            config,
            format: cli.output,
            state_dir,
        }
    }

    /// Loads a manifest and resolves it into a resource graph.
    pub async fn load_graph(&self, path: &Path) -> Result<(Manifest, ResourceGraph)> {
        let manifest = Manifest::from_file(path).await?;
        tracing::debug!(
            manifest = %manifest.name,
            resources = manifest.resource_count(),
            "manifest loaded"
        );
        let graph = ResourceGraph::from_manifest(&manifest)?;
        Ok((manifest, graph))
    }

    /// Picks the deployment name: explicit argument, configured default,
    /// then the manifest name.
    pub fn deployment_name(&self, explicit: Option<&String>, manifest: &Manifest) -> String {
        explicit
            .cloned()
            .or_else(|| self.config.defaults.deployment.clone())
            .unwrap_or_else(|| manifest.name.clone())
    }
}
