//! Configuration loading for the HookRoller CLI.
//!
//! Turns parsed arguments into a validated [`ConfigurationContext`], and loads
//! the optional env file that feeds the environment variable fallbacks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bitbucket_client::{ApiEndpoints, ClientCredentials, EventSpec};
use hook_roller_core::{ConfigurationContext, HookRollerError, WebhookSettings};
use tracing::debug;

use crate::args::Cli;
use crate::errors::Error;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Env file looked up when `--env-file` is not given.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Loads an env file into the process environment.
///
/// Variables that are already set are not overwritten. A missing default file
/// is fine; a missing file that was asked for explicitly is an error.
///
/// Returns the path that was loaded, if any.
pub fn load_env_file(explicit: Option<&Path>) -> Result<Option<PathBuf>, Error> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_ENV_FILE), false),
    };

    match dotenvy::from_path(&path) {
        Ok(()) => {
            debug!(path = %path.display(), "Loaded env file");
            Ok(Some(path))
        }
        Err(dotenvy::Error::Io(ref io_err))
            if !required && io_err.kind() == std::io::ErrorKind::NotFound =>
        {
            Ok(None)
        }
        Err(e) => Err(Error::Config(format!(
            "Failed to load env file '{}': {e}",
            path.display()
        ))),
    }
}

/// Builds the run configuration from the parsed arguments.
///
/// # Errors
/// Returns `Error::Config` naming the first missing or malformed setting.
pub fn build_configuration(cli: &Cli) -> Result<ConfigurationContext, Error> {
    let key = required(&cli.key, "BITBUCKET_KEY")?;
    let secret = required(&cli.secret, "BITBUCKET_SECRET")?;
    let username = required(&cli.username, "BITBUCKET_USERNAME")?;
    let events = required(&cli.events, "WEBHOOK_EVENTS")?;
    let url = required(&cli.webhook_url, "WEBHOOK_URL")?;

    let events = EventSpec::parse_list(events)
        .map_err(|e| Error::Config(format!("WEBHOOK_EVENTS: {e}")))?;

    let active = match cli.active.as_deref() {
        Some(value) => parse_bool(value).ok_or_else(|| {
            Error::Config(format!("WEBHOOK_ACTIVE: '{value}' is not a boolean"))
        })?,
        None => false,
    };

    let endpoints = ApiEndpoints::new(&cli.auth_base_url, &cli.api_base_url)
        .map_err(|e| Error::Config(format!("Invalid base URL: {e}")))?;

    ConfigurationContext::builder(
        ClientCredentials::new(key, secret),
        username,
        events,
        WebhookSettings {
            url: url.to_string(),
            description_template: cli.description.clone(),
            active,
        },
    )
    .endpoints(endpoints)
    .check_existing(!cli.skip_existing_check)
    .dry_run(cli.dry_run)
    .provision_interval(Duration::from_millis(cli.delay_ms))
    .build()
    .map_err(|e| match e {
        HookRollerError::Configuration { reason } => Error::Config(reason),
        e => Error::Run(e),
    })
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, Error> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}

/// Parses the boolean spellings accepted for `WEBHOOK_ACTIVE`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
