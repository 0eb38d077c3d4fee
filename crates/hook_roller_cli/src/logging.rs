//! Tracing subscriber setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::LogFormat;

/// Environment variable holding the log filter directives.
pub const LOG_FILTER_ENV: &str = "HOOK_ROLLER_LOG";

const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global subscriber. Logs go to stderr; stdout carries the report.
pub fn init_logging(format: LogFormat) {
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }
}
