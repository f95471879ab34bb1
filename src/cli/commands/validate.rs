//! `netforge validate` - check a manifest and its resource graph.

use std::path::PathBuf;

use clap::Parser;

use crate::error::Result;
use crate::validate;

use super::CommandContext;

/// Arguments for the validate command.
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Manifest file to validate
    pub manifest: PathBuf,
}

impl ValidateArgs {
    /// Executes the command, returning the process exit code.
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let (manifest, graph) = ctx.load_graph(&self.manifest).await?;

        ctx.output.banner(&format!("VALIDATE [{}]", manifest.name));
        let report = validate::validate(&graph);

        if ctx.output.is_json() {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            ctx.output.validation_report(&report);
        }

        Ok(if report.has_errors() { 4 } else { 0 })
    }
}
