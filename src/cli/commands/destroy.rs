//! `netforge destroy` - tear down a deployment.

use clap::Parser;

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::plan;
use crate::state::JsonStateStore;

use super::deploy::ProgressSink;
use super::CommandContext;

/// Arguments for the destroy command.
#[derive(Parser, Debug, Clone)]
pub struct DestroyArgs {
    /// Deployment to tear down
    #[arg(long)]
    pub deployment: String,
}

impl DestroyArgs {
    /// Executes the command, returning the process exit code.
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let store = JsonStateStore::new(&ctx.state_dir)?;
        let engine = Engine::new(store);
        let state = engine.store().load(&self.deployment)?;

        // Destroy is a plan against an empty desired graph.
        let empty = ResourceGraph::new();
        let plan = plan::plan(&self.deployment, &empty, &state)?;

        ctx.output.banner(&format!("DESTROY [{}]", self.deployment));
        ctx.output.plan(&plan);

        if !plan.has_changes() {
            ctx.output.info("Nothing to destroy.");
            return Ok(0);
        }

        let sink = ProgressSink::new(plan.changing_steps().count() as u64, ctx.output.is_json());
        let report = engine.apply(&empty, &plan, &sink).await?;
        sink.finish();

        for outcome in &report.outcomes {
            ctx.output.step_outcome(outcome);
        }
        if ctx.output.is_json() {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            ctx.output.deploy_summary(&report);
        }

        if report.has_failures() {
            return Err(Error::DeploymentAborted {
                deployment: self.deployment.clone(),
                applied: report.applied_count(),
                failed: report.failed_count(),
            });
        }

        if engine.purge_if_empty(&self.deployment)? {
            ctx.output
                .info(&format!("Deployment '{}' removed from state", self.deployment));
        }
        Ok(0)
    }
}
