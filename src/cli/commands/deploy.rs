//! `netforge deploy` - apply a manifest to a deployment.

use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use crate::engine::{Engine, EventSink, StepOutcome};
use crate::error::{Error, Result};
use crate::plan;
use crate::state::JsonStateStore;
use crate::validate;

use super::CommandContext;

/// Arguments for the deploy command.
#[derive(Parser, Debug, Clone)]
pub struct DeployArgs {
    /// Manifest file to deploy
    pub manifest: PathBuf,

    /// Deployment name (defaults to the manifest name)
    #[arg(long)]
    pub deployment: Option<String>,

    /// Compute and show the plan without applying it
    #[arg(long)]
    pub plan_only: bool,
}

impl DeployArgs {
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
        let engine = Engine::new(store);
        let state = engine.store().load_or_new(&deployment)?;
        let plan = plan::plan(&deployment, &graph, &state)?;

        ctx.output.banner(&format!("DEPLOY [{}]", deployment));
        ctx.output.plan(&plan);

        if self.plan_only {
            return Ok(0);
        }
        if !plan.has_changes() {
            ctx.output.info("Nothing to apply.");
            return Ok(0);
        }

        let changing = plan.changing_steps().count();
        let sink = ProgressSink::new(changing as u64, ctx.output.is_json());
        let report = engine.apply(&graph, &plan, &sink).await?;
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
                deployment,
                applied: report.applied_count(),
                failed: report.failed_count(),
            });
        }
        Ok(0)
    }
}

/// Progress bar fed by engine step events.
pub(crate) struct ProgressSink {
    bar: ProgressBar,
}

impl ProgressSink {
    pub(crate) fn new(total: u64, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total)
        };
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .expect("progress template is valid"),
        );
        Self { bar }
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl EventSink for ProgressSink {
    fn on_step(&self, outcome: &StepOutcome) {
        self.bar.set_message(outcome.resource_id.clone());
        self.bar.inc(1);
    }
}
