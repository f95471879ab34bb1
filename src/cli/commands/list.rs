//! `netforge list` - list known deployments.

use clap::Parser;
use serde::Serialize;

use crate::error::{ErrorContext, Result};
use crate::state::JsonStateStore;

use super::CommandContext;

/// Arguments for the list command.
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {}

/// One row of `netforge list` output.
#[derive(Debug, Serialize)]
struct DeploymentRow {
    name: String,
    resources: usize,
    serial: u64,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl ListArgs {
    /// Executes the command, returning the process exit code.
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let store = JsonStateStore::new(&ctx.state_dir)?;
        let names = store
            .list()
            .with_context(|| format!("Failed to list state in {}", ctx.state_dir.display()))?;

        let mut rows = Vec::with_capacity(names.len());
        for name in names {
            let state = store.load(&name)?;
            rows.push(DeploymentRow {
                name,
                resources: state.len(),
                serial: state.serial,
                updated_at: state.updated_at,
            });
        }

        if ctx.output.is_json() {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(0);
        }

        if rows.is_empty() {
            ctx.output.info("No deployments recorded.");
            return Ok(0);
        }

        ctx.output.section("Deployments");
        for row in rows {
            ctx.output.info(&format!(
                "{}  {} resource(s), serial {}, updated {}",
                row.name,
                row.resources,
                row.serial,
                row.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        Ok(0)
    }
}
