//! `netforge plan` - show what a deploy would change.

use std::path::PathBuf;

use clap::Parser;

use crate::error::Result;
use crate::plan;
use crate::state::JsonStateStore;
use crate::validate;

use super::CommandContext;

/// Arguments for the plan command.
#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    /// Manifest file to plan against
    pub manifest: PathBuf,

    /// Deployment name (defaults to the manifest name)
    #[arg(long)]
    pub deployment: Option<String>,
}

impl PlanArgs {
    /// Executes the command, returning the process exit code.
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let (manifest, graph) = ctx.load_graph(&self.manifest).await?;

        let report = validate::validate(&graph);
        ctx.output.validation_report(&report);
        if report.has_errors() {
            return Ok(4);
        }

        let deployment = ctx.deployment_name(self.deployment.as_ref(), &manifest);
        let store = JsonStateStore::new(&ctx.state_dir)?;
        let state = store.load_or_new(&deployment)?;
        let plan = plan::plan(&deployment, &graph, &state)?;

        ctx.output.banner(&format!("PLAN [{}]", deployment));
        if ctx.output.is_json() {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            ctx.output.plan(&plan);
            if !plan.has_changes() {
                ctx.output.info("No changes. State matches the manifest.");
            }
        }

        Ok(0)
    }
}
