//! Authentication and authorization handler for HookRoller
//!
//! This crate obtains an access token for a Bitbucket OAuth consumer and checks,
//! before anything is changed on the server, that the token carries every scope
//! the requested webhook events need.
//!
//! ## Architecture
//!
//! - [`AuthenticationService`] is the seam the orchestrator depends on
//! - [`BitbucketAuthService`] implements it with the client-credentials grant
//! - [`scopes`] holds the pure scope checks

use async_trait::async_trait;
use bitbucket_client::{AccessToken, ClientCredentials};

mod bitbucket_auth_service;
pub mod scopes;

pub use bitbucket_auth_service::BitbucketAuthService;
pub use scopes::{check_base_scopes, check_event_scopes, ScopeRequirement, ScopeSet};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Result type for authentication operations
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during authentication/authorization operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token endpoint answered with a status other than 200.
    #[error("Authenticate request failed. Status code: {status_code}")]
    AuthenticationFailed { status_code: u16 },

    /// The token endpoint answered 200 but handed back an empty token.
    #[error("Couldn't be authenticated to the Bitbucket API: the access token is empty")]
    EmptyAccessToken,

    /// The token is missing scopes. Every missing requirement is listed.
    #[error("Missing required scopes: {}", .missing.join(", "))]
    MissingScopes { missing: Vec<String> },

    /// The token request never produced a response.
    #[error("Transport error during authentication: {0}")]
    Transport(#[source] bitbucket_client::Error),

    /// The token response could not be understood.
    #[error("Invalid token response: {0}")]
    InvalidResponse(#[source] bitbucket_client::Error),
}

impl From<bitbucket_client::Error> for AuthError {
    fn from(value: bitbucket_client::Error) -> Self {
        match value {
            bitbucket_client::Error::UnexpectedStatus { status, .. } => {
                AuthError::AuthenticationFailed {
                    status_code: status,
                }
            }
            e if e.is_transport() => AuthError::Transport(e),
            e => AuthError::InvalidResponse(e),
        }
    }
}

/// Access token acquisition interface
///
/// Exchanges consumer credentials for an access token. Implementations make a
/// single attempt; failures are not retried.
#[async_trait]
pub trait AuthenticationService: Send + Sync {
    /// Authenticate with the given consumer credentials
    ///
    /// # Returns
    /// A non-empty access token
    ///
    /// # Errors
    /// - `AuthError::AuthenticationFailed` if the token endpoint rejects the request
    /// - `AuthError::EmptyAccessToken` if the endpoint returns an empty token
    /// - `AuthError::Transport` if the endpoint could not be reached
    async fn authenticate(&self, credentials: &ClientCredentials) -> AuthResult<AccessToken>;
}
