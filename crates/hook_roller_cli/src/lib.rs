//! HookRoller CLI library exports for integration testing.
//!
//! This module exposes the argument parsing, configuration loading and
//! report rendering used by the `hook-roller` binary.

use hook_roller_core::{provision_account_webhooks, provision_account_webhooks_with, RunReport};

pub mod args;
pub mod config;
pub mod errors;
pub mod logging;
pub mod report;

use args::{Cli, OutputFormat};
use errors::Error;
use report::ProgressPrinter;

/// Builds the configuration from the parsed arguments and runs the pipeline.
///
/// # Errors
/// - `Error::Config` if a setting is missing or malformed
/// - `Error::Run` if the run stopped on a fatal error
///
/// With text output, a line is printed to stdout for every created or failed
/// repository while the run progresses.
pub async fn run(cli: &Cli) -> Result<RunReport, Error> {
    let config = config::build_configuration(cli)?;

    let report = match cli.output {
        OutputFormat::Text => {
            let progress = ProgressPrinter::stdout();
            provision_account_webhooks_with(&config, &progress).await?
        }
        OutputFormat::Json => provision_account_webhooks(&config).await?,
    };
    Ok(report)
}
