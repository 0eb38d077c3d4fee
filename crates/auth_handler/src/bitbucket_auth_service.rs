//! Bitbucket OAuth consumer authentication service implementation
//!
//! Provides the concrete implementation of `AuthenticationService` using the
//! OAuth2 client-credentials grant.

use crate::{AuthError, AuthResult, AuthenticationService};
use async_trait::async_trait;
use bitbucket_client::{AccessToken, BitbucketClient, ClientCredentials};
use tracing::{error, info};

#[cfg(test)]
#[path = "bitbucket_auth_service_tests.rs"]
mod tests;

/// Bitbucket OAuth consumer authentication service
///
/// # Examples
///
/// ```rust,no_run
/// use auth_handler::{AuthenticationService, BitbucketAuthService};
/// use bitbucket_client::{ApiEndpoints, BitbucketClient, ClientCredentials};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = BitbucketClient::new(ApiEndpoints::default())?;
/// let auth_service = BitbucketAuthService::new(&client);
///
/// let credentials = ClientCredentials::new("consumer-key", "consumer-secret");
/// let token = auth_service.authenticate(&credentials).await?;
/// println!("Granted scopes: {}", token.scopes());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BitbucketAuthService<'a> {
    client: &'a BitbucketClient,
}

impl<'a> BitbucketAuthService<'a> {
    /// Create a new authentication service on top of an unauthenticated client
    pub fn new(client: &'a BitbucketClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthenticationService for BitbucketAuthService<'_> {
    async fn authenticate(&self, credentials: &ClientCredentials) -> AuthResult<AccessToken> {
        let token = self.client.request_access_token(credentials).await?;

        if token.is_empty() {
            error!("Token endpoint returned an empty access token");
            return Err(AuthError::EmptyAccessToken);
        }

        info!("Authenticated to the Bitbucket API");
        Ok(token)
    }
}
