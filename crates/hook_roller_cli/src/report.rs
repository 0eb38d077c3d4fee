//! Console output: per-repository progress lines and the final report.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use bitbucket_client::Repository;
use colored::Colorize;
use hook_roller_core::{
    HookRollerError, ProvisionObserver, ProvisionOutcome, ProvisionSummary, RunReport,
};
use tracing::warn;

use crate::args::OutputFormat;
use crate::errors::Error;

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

/// Renders the report in the requested format.
pub fn render(report: &RunReport, format: OutputFormat) -> Result<String, Error> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

/// Prints `Added: <full_name>` and `Failed: <full_name>` as each repository finishes.
pub struct ProgressPrinter<W> {
    out: Mutex<W>,
}

impl ProgressPrinter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ProgressPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            warn!(error = %e, "Failed to write progress line");
        }
    }
}

impl<W: Write + Send> ProvisionObserver for ProgressPrinter<W> {
    fn repository_provisioned(&self, repository: &Repository, outcome: ProvisionOutcome) {
        if outcome == ProvisionOutcome::Created {
            self.write_line(&format!("Added: {}", repository.full_name));
        }
    }

    fn repository_failed(&self, repository: &Repository, _error: &HookRollerError) {
        self.write_line(&format!("{} {}", "Failed:".red(), repository.full_name));
    }
}

/// Text form of a finished run.
///
/// A dry run lists every repository that would get the webhook. A real run
/// only gets the summary line, the per-repository lines having been printed
/// by [`ProgressPrinter`] while it ran.
pub fn render_text(report: &RunReport) -> String {
    match report {
        RunReport::DryRun { repositories } => {
            let mut output = String::new();
            for name in repositories {
                output.push_str(&format!("Would add: {name}\n"));
            }
            output.push_str(&format!(
                "{} {} repositories found, no webhooks created\n",
                "Dry run:".yellow().bold(),
                repositories.len()
            ));
            output
        }
        RunReport::Provisioned(summary) => render_summary(summary),
    }
}

fn render_summary(summary: &ProvisionSummary) -> String {
    let headline = if summary.is_success() {
        "Done.".green().bold()
    } else {
        "Done with failures.".red().bold()
    };
    format!(
        "{headline} Created: {}, already present: {}, failed: {}\n",
        summary.created, summary.already_present, summary.failed
    )
}
