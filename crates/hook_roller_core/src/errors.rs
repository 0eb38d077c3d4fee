//! Error types for the provisioning pipeline.
//!
//! Errors split into two groups. Fatal errors (authentication, scope checks,
//! repository listing, configuration) stop the run before any webhook is
//! created. [`HookRollerError::Provision`] belongs to a single repository and
//! never stops the batch.

use auth_handler::AuthError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Result type used throughout the crate.
pub type HookRollerResult<T> = Result<T, HookRollerError>;

#[derive(Error, Debug)]
pub enum HookRollerError {
    /// The configuration is incomplete or malformed.
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// A request never produced an HTTP response.
    #[error("Transport error: {0}")]
    Transport(#[source] bitbucket_client::Error),

    /// The token endpoint rejected the consumer credentials.
    #[error("Authenticate request failed. Status code: {status_code}")]
    Authentication { status_code: u16 },

    /// The token endpoint returned 200 with an empty token.
    #[error("Couldn't be authenticated to the Bitbucket API: the access token is empty")]
    EmptyAccessToken,

    /// The token lacks scopes; every missing requirement is listed.
    #[error("Missing required scopes: {}", .missing.join(", "))]
    MissingScopes { missing: Vec<String> },

    /// A repository listing page came back with a non-200 status.
    #[error("Failed to fetch repository page {page}. Status code: {status_code}")]
    RepositoryFetch { page: u32, status_code: u16 },

    /// A response body could not be understood.
    #[error("Invalid response from Bitbucket: {0}")]
    InvalidResponse(#[source] bitbucket_client::Error),

    /// The webhook for one repository could not be created.
    #[error("Failed to provision webhook for {repository}: {reason}")]
    Provision {
        repository: String,
        status_code: Option<u16>,
        reason: String,
    },
}

impl HookRollerError {
    /// Returns true if the error must stop the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HookRollerError::Provision { .. })
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        HookRollerError::Configuration {
            reason: reason.into(),
        }
    }

    /// Wraps a client error raised while working on a single repository.
    pub(crate) fn provision(repository: &str, error: bitbucket_client::Error) -> Self {
        HookRollerError::Provision {
            repository: repository.to_string(),
            status_code: error.status_code(),
            reason: error.to_string(),
        }
    }
}

impl From<AuthError> for HookRollerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::AuthenticationFailed { status_code } => {
                HookRollerError::Authentication { status_code }
            }
            AuthError::EmptyAccessToken => HookRollerError::EmptyAccessToken,
            AuthError::MissingScopes { missing } => HookRollerError::MissingScopes { missing },
            AuthError::Transport(e) => HookRollerError::Transport(e),
            AuthError::InvalidResponse(e) => HookRollerError::InvalidResponse(e),
        }
    }
}
