//! Output formatting for the Netforge CLI.
//!
//! Provides colored, human-readable rendering of plans, validation
//! reports, and apply outcomes. All human output is muted in JSON mode.

use colored::Colorize;

use crate::engine::{DeployReport, StepOutcome, StepStatus};
use crate::plan::{Plan, PlanStep, PlanSummary, PropertyChange, StepAction};
use crate::validate::{Severity, ValidationReport};
use similar::{ChangeTag, TextDiff};

/// Output formatter for different output modes.
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter.
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            json_mode,
            verbosity,
        }
    }

    /// Whether human output is muted.
    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Print a banner/header.
    pub fn banner(&self, title: &str) {
        if self.json_mode {
            return;
        }

        let line = "=".repeat(title.len() + 4);
        if self.use_color {
            println!("\n{}", line.bright_blue());
            println!("{}", format!("  {}  ", title).bright_blue().bold());
            println!("{}\n", line.bright_blue());
        } else {
            println!("\n{}", line);
            println!("  {}  ", title);
            println!("{}\n", line);
        }
    }

    /// Print a section header.
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print an informational message.
    pub fn info(&self, message: &str) {
        if self.json_mode {
            return;
        }
        println!("{}", message);
    }

    /// Print a warning message.
    pub fn warn(&self, message: &str) {
        if self.json_mode {
            return;
        }
        if self.use_color {
            eprintln!("{} {}", "warning:".yellow().bold(), message);
        } else {
            eprintln!("warning: {}", message);
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "error:".red().bold(), message);
        } else {
            eprintln!("error: {}", message);
        }
    }

    /// Render a whole plan: its changing steps and the summary line.
    pub fn plan(&self, plan: &Plan) {
        if self.json_mode {
            return;
        }

        for step in plan.steps() {
            self.plan_step(step);
        }
        self.plan_summary(&plan.summary());
    }

    /// Render one plan step.
    pub fn plan_step(&self, step: &PlanStep) {
        if self.json_mode {
            return;
        }
        if step.action == StepAction::Noop && self.verbosity == 0 {
            return;
        }

        let symbol = match step.action {
            StepAction::Create => "+",
            StepAction::Update => "~",
            StepAction::Replace => "±",
            StepAction::Delete => "-",
            StepAction::Noop => "=",
        };
        let line = format!("{symbol} {} ({})", step.resource_id, step.kind);
        if self.use_color {
            let colored_line = match step.action {
                StepAction::Create => line.green().to_string(),
                StepAction::Update => line.yellow().to_string(),
                StepAction::Replace => line.magenta().to_string(),
                StepAction::Delete => line.red().to_string(),
                StepAction::Noop => line.bright_black().to_string(),
            };
            println!("{}", colored_line);
        } else {
            println!("{}", line);
        }

        for change in &step.changes {
            self.property_change(change);
        }
    }

    fn property_change(&self, change: &PropertyChange) {
        let old = render_value(&change.old);
        let new = render_value(&change.new);

        if old.lines().count() <= 1 && new.lines().count() <= 1 {
            let line = format!("    {}: {} -> {}", change.path, old, new);
            if self.use_color {
                println!("{}", line.bright_black());
            } else {
                println!("{}", line);
            }
            return;
        }

        println!("    {}:", change.path);
        let diff = TextDiff::from_lines(&old, &new);
        for entry in diff.iter_all_changes() {
            let (sign, styled) = match entry.tag() {
                ChangeTag::Delete => ("-", true),
                ChangeTag::Insert => ("+", true),
                ChangeTag::Equal => (" ", false),
            };
            let line = format!("      {sign} {}", entry.value().trim_end());
            if self.use_color && styled {
                let colored_line = if sign == "-" {
                    line.red().to_string()
                } else {
                    line.green().to_string()
                };
                println!("{}", colored_line);
            } else {
                println!("{}", line);
            }
        }
    }

    /// Render the plan summary line.
    pub fn plan_summary(&self, summary: &PlanSummary) {
        if self.json_mode {
            return;
        }
        println!("\nPlan: {}", summary);
    }

    /// Render a validation report.
    pub fn validation_report(&self, report: &ValidationReport) {
        if self.json_mode {
            return;
        }

        for violation in report.violations() {
            let line = violation.to_string();
            if self.use_color {
                let colored_line = match violation.severity {
                    Severity::Error => line.red().to_string(),
                    Severity::Warning => line.yellow().to_string(),
                };
                println!("{}", colored_line);
            } else {
                println!("{}", line);
            }
        }

        if report.is_clean() {
            self.info("Validation passed");
        } else {
            println!(
                "\n{} error(s), {} warning(s)",
                report.error_count(),
                report.warning_count()
            );
        }
    }

    /// Render one step outcome from an apply run.
    pub fn step_outcome(&self, outcome: &StepOutcome) {
        if self.json_mode {
            return;
        }
        if outcome.status == StepStatus::Skipped && self.verbosity == 0 {
            return;
        }

        let status = if self.use_color {
            match outcome.status {
                StepStatus::Applied => "applied".green().to_string(),
                StepStatus::Failed => "failed".red().bold().to_string(),
                StepStatus::Skipped => "skipped".bright_black().to_string(),
            }
        } else {
            match outcome.status {
                StepStatus::Applied => "applied".to_string(),
                StepStatus::Failed => "failed".to_string(),
                StepStatus::Skipped => "skipped".to_string(),
            }
        };

        let mut line = format!("{}: {} [{}]", outcome.resource_id, status, outcome.action);
        if let Some(message) = &outcome.message {
            line.push_str(&format!(" - {message}"));
        }
        println!("{}", line);
    }

    /// Render the closing summary of an apply run.
    pub fn deploy_summary(&self, report: &DeployReport) {
        if self.json_mode {
            return;
        }
        let line = format!(
            "\n{}: {} applied, {} failed, {} skipped",
            report.deployment,
            report.applied_count(),
            report.failed_count(),
            report.skipped_count()
        );
        if self.use_color && report.has_failures() {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "(none)".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
