//! CLI module for Netforge.
//!
//! This module provides the command-line interface for Netforge,
//! including argument parsing, output formatting, and subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Netforge - a declarative network-topology provisioning engine
///
/// Synthesizes, validates, plans, and applies network topologies described
/// by YAML manifests.
#[derive(Parser, Debug, Clone)]
#[command(name = "netforge")]
#[command(author = "Netforge Contributors")]
#[command(version)]
#[command(about = "A declarative network-topology provisioning engine", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv, -vvvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Directory deployment state is stored in
    #[arg(long, global = true, env = "NETFORGE_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "NETFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    Human,
    /// JSON output for scripting
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Human
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Synthesize the resource graph from a manifest
    Synth(commands::synth::SynthArgs),

    /// Validate a manifest and its resource graph
    Validate(commands::validate::ValidateArgs),

    /// Show the changes a deploy would make
    Plan(commands::plan::PlanArgs),

    /// Apply a manifest to a deployment
    Deploy(commands::deploy::DeployArgs),

    /// Tear down a deployment
    Destroy(commands::destroy::DestroyArgs),

    /// List known deployments
    List(commands::list::ListArgs),

    /// Initialize a new Netforge project
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for init command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

/// Arguments for completions command
#[derive(Parser, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-4)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(4)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["netforge", "plan", "topology.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Plan(_)));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "netforge",
            "deploy",
            "topology.yaml",
            "-vv",
            "--no-color",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbosity(), 2);
        assert!(cli.no_color);
        assert!(cli.is_json());
    }
}
