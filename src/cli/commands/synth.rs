//! `netforge synth` - emit the resolved resource graph.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::Result;
use crate::validate;

use super::CommandContext;

/// Arguments for the synth command.
#[derive(Parser, Debug, Clone)]
pub struct SynthArgs {
    /// Manifest file to synthesize
    pub manifest: PathBuf,

    /// Output format of the synthesized graph
    #[arg(long, default_value = "json")]
    pub format: SynthFormat,

    /// Write the document to a file instead of stdout
    #[arg(short = 'o', long)]
    pub out: Option<PathBuf>,
}

/// Serialization formats for a synthesized graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SynthFormat {
    /// JSON synthesis document
    Json,
    /// Graphviz DOT
    Dot,
}

impl SynthArgs {
    /// Executes the command, returning the process exit code.
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let (manifest, graph) = ctx.load_graph(&self.manifest).await?;

        let report = validate::validate(&graph);
        ctx.output.validation_report(&report);
        if report.has_errors() {
            return Ok(4);
        }

        let rendered = match self.format {
            SynthFormat::Json => graph.to_document(&manifest.name)?.to_json_pretty()?,
            SynthFormat::Dot => graph.to_dot(),
        };

        match &self.out {
            Some(path) => {
                tokio::fs::write(path, rendered.as_bytes()).await?;
                ctx.output
                    .info(&format!("Synthesized graph written to {}", path.display()));
            }
            None => println!("{rendered}"),
        }

        Ok(0)
    }
}
