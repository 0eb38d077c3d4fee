use hook_roller_core::HookRollerError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Process exit status for a completed run, including runs with per-repository failures.
pub const EXIT_SUCCESS: i32 = 0;

/// Process exit status when the run was aborted by a fatal error.
pub const EXIT_FAILURE: i32 = 1;

/// Process exit status when the settings are incomplete or malformed.
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Errors that can occur in the HookRoller CLI application.
#[derive(Error, Debug)]
pub enum Error {
    /// A setting is missing or malformed, or the env file could not be read.
    ///
    /// Raised before any network call is made.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provisioning run stopped on a fatal error.
    #[error("{0}")]
    Run(#[from] HookRollerError),

    #[error("Failed to serialize the run report: {0}")]
    Report(#[from] serde_json::Error),
}

impl Error {
    /// The process exit status that reports this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::Run(HookRollerError::Configuration { .. }) => {
                EXIT_CONFIG_ERROR
            }
            Error::Run(_) | Error::Report(_) => EXIT_FAILURE,
        }
    }
}
