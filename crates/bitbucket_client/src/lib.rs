//! Crate for interacting with the Bitbucket Cloud REST API.
//!
//! This crate provides a client that exchanges OAuth consumer credentials for an
//! access token, lists the repositories of an account page by page, and reads and
//! creates repository webhooks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument};
use url::Url;

pub mod errors;
pub use errors::Error;

pub mod models;
pub use models::{AccessToken, ClientCredentials, Repository, RepositoryPage};

pub mod webhook;
pub use webhook::{EventCategory, EventSpec, InvalidEventSpec, WebhookPayload};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Host serving the OAuth2 token endpoint.
pub const DEFAULT_AUTH_BASE_URL: &str = "https://bitbucket.org";

/// Root of the Bitbucket Cloud 2.0 REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.bitbucket.org/2.0";

/// Number of repositories requested per listing page.
pub const REPOSITORY_PAGE_LENGTH: u32 = 100;

/// Fields stripped from the repository listing to keep pages small.
pub const REPOSITORY_FIELD_EXCLUSIONS: &str = "-values.links,-values.project,-values.mainbranch,\
-values.owner,-values.website,-values.has_wiki,-values.language,-values.fork_policy,\
-values.created_on,-values.has_issues,-values.updated_on,-values.size,-values.slug,-values.type";

/// Partial response filter for the webhook listing. `next` must be kept or
/// Bitbucket drops the pagination link.
const WEBHOOK_URL_FIELDS: &str = "values.url,next";

const TOKEN_PATH: &str = "site/oauth2/access_token";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("hook-roller/", env!("CARGO_PKG_VERSION"));

/// Base URLs of the two Bitbucket hosts the client talks to.
///
/// Both default to Bitbucket Cloud; tests point them at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    auth_base_url: String,
    api_base_url: String,
}

impl ApiEndpoints {
    /// Creates endpoints from two base URLs.
    ///
    /// # Errors
    /// Returns `Error::InvalidUrl` if either value is not an absolute URL.
    pub fn new(auth_base_url: &str, api_base_url: &str) -> Result<Self, Error> {
        Url::parse(auth_base_url)?;
        Url::parse(api_base_url)?;

        Ok(Self {
            auth_base_url: auth_base_url.trim_end_matches('/').to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The OAuth2 token endpoint.
    pub fn token_url(&self) -> String {
        format!("{}/{}", self.auth_base_url, TOKEN_PATH)
    }

    /// The repository listing endpoint for an account.
    pub fn repositories_url(&self, username: &str) -> String {
        format!("{}/repositories/{}", self.api_base_url, username)
    }

    /// The webhook collection endpoint of a repository, keyed by its full name.
    pub fn webhooks_url(&self, full_name: &str) -> String {
        format!("{}/repositories/{}/hooks", self.api_base_url, full_name)
    }
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

/// A client for the Bitbucket Cloud API.
///
/// A freshly created client is unauthenticated and can only exchange consumer
/// credentials for a token. Use [`BitbucketClient::with_access_token`] to get a
/// client for the repository and webhook endpoints.
#[derive(Debug)]
pub struct BitbucketClient {
    http: reqwest::Client,
    endpoints: ApiEndpoints,
    access_token: Option<SecretString>,
}

impl BitbucketClient {
    /// Creates a new, unauthenticated client.
    ///
    /// # Errors
    /// Returns `Error::ClientBuild` if the underlying HTTP client cannot be built.
    pub fn new(endpoints: ApiEndpoints) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            endpoints,
            access_token: None,
        })
    }

    /// Returns a client that sends the given token as a bearer credential.
    ///
    /// The connection pool is shared with `self`.
    pub fn with_access_token(&self, token: &AccessToken) -> Self {
        Self {
            http: self.http.clone(),
            endpoints: self.endpoints.clone(),
            access_token: Some(SecretString::from(
                token.secret().expose_secret().to_string(),
            )),
        }
    }

    /// The endpoints this client talks to.
    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Exchanges consumer credentials for an access token using the OAuth2
    /// client-credentials grant.
    ///
    /// The key and secret travel as HTTP Basic credentials; the body is the
    /// form `grant_type=client_credentials`.
    ///
    /// # Errors
    ///
    /// - `Error::UnexpectedStatus` if the endpoint answers with anything but 200
    /// - `Error::Transport` if no response was received
    /// - `Error::Deserialization` if the body is not a token response
    #[instrument(skip(self, credentials), fields(consumer_key = %credentials.key()))]
    pub async fn request_access_token(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<AccessToken, Error> {
        let url = self.endpoints.token_url();
        debug!(url = %url, "Requesting access token");

        let response = self
            .http
            .post(&url)
            .basic_auth(credentials.key(), Some(credentials.secret().expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Token request did not reach Bitbucket");
                Error::Transport(e)
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(status = status.as_u16(), "Token endpoint rejected the credentials");
            return Err(Error::UnexpectedStatus {
                operation: "Authenticate".to_string(),
                status: status.as_u16(),
            });
        }

        let token: models::TokenResponse = read_json(response).await?;
        let token = AccessToken::from(token);

        info!(
            token_type = token.token_type(),
            expires_in = token.expires_in(),
            "Received access token"
        );
        Ok(token)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl RepositoryClient for BitbucketClient {
    #[instrument(skip(self), fields(username = %username, page = page))]
    async fn list_repositories_page(
        &self,
        username: &str,
        page: u32,
    ) -> Result<RepositoryPage, Error> {
        let url = self.endpoints.repositories_url(username);
        let page_length = REPOSITORY_PAGE_LENGTH.to_string();
        let page_index = page.to_string();

        let response = self
            .authorize(self.http.get(&url))
            .query(&[
                ("pagelen", page_length.as_str()),
                ("page", page_index.as_str()),
                ("fields", REPOSITORY_FIELD_EXCLUSIONS),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(
                status = status.as_u16(),
                "Failed to fetch repository listing page"
            );
            return Err(Error::UnexpectedStatus {
                operation: "List repositories".to_string(),
                status: status.as_u16(),
            });
        }

        let page: RepositoryPage = read_json(response).await?;
        debug!(
            count = page.values.len(),
            size = ?page.size,
            "Fetched repository listing page"
        );
        Ok(page)
    }

    #[instrument(skip(self), fields(repository = %full_name))]
    async fn list_webhook_urls(&self, full_name: &str) -> Result<Vec<String>, Error> {
        let url = self.endpoints.webhooks_url(full_name);
        let mut request = self
            .authorize(self.http.get(&url))
            .query(&[("fields", WEBHOOK_URL_FIELDS)]);

        let mut urls = Vec::new();
        let mut pages = 0u32;
        loop {
            let response = request.send().await?;
            pages += 1;

            let status = response.status();
            if status != StatusCode::OK {
                error!(
                    status = status.as_u16(),
                    page = pages,
                    "Couldn't fetch repository webhooks"
                );
                return Err(Error::UnexpectedStatus {
                    operation: "List webhooks".to_string(),
                    status: status.as_u16(),
                });
            }

            let hooks: webhook::WebhookUrlPage = read_json(response).await?;
            let (page_urls, next) = hooks.into_parts();
            if page_urls.is_empty() {
                break;
            }
            urls.extend(page_urls);

            // The `next` link already carries the `fields` filter.
            match next {
                Some(next) => request = self.authorize(self.http.get(&next)),
                None => break,
            }
        }

        debug!(count = urls.len(), pages, "Listed repository webhooks");
        Ok(urls)
    }

    #[instrument(skip(self, payload), fields(repository = %full_name))]
    async fn create_webhook(&self, full_name: &str, payload: &WebhookPayload) -> Result<(), Error> {
        let url = self.endpoints.webhooks_url(full_name);

        let response = self
            .authorize(self.http.post(&url))
            .json(payload)
            .send()
            .await?;

        // Bitbucket documents 201 for a created hook; older deployments answer 200.
        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "Failed to create webhook");
            return Err(Error::UnexpectedStatus {
                operation: "Create webhook".to_string(),
                status: status.as_u16(),
            });
        }

        debug!(status = status.as_u16(), "Webhook created");
        Ok(())
    }
}

/// Repository and webhook operations needed to provision an account.
///
/// Implemented by [`BitbucketClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Fetches one page of the repositories owned by `username`.
    ///
    /// `page` is one-based. Every page is requested with
    /// [`REPOSITORY_PAGE_LENGTH`] entries.
    ///
    /// # Errors
    /// Returns `Error::UnexpectedStatus` for any status other than 200 and
    /// `Error::Transport` if the request failed outright.
    async fn list_repositories_page(
        &self,
        username: &str,
        page: u32,
    ) -> Result<RepositoryPage, Error>;

    /// Lists the callback URLs of the webhooks already registered on a repository.
    async fn list_webhook_urls(&self, full_name: &str) -> Result<Vec<String>, Error>;

    /// Creates a webhook on the repository identified by `full_name`.
    ///
    /// # Errors
    /// Returns `Error::UnexpectedStatus` for a non-success status and
    /// `Error::Transport` if the request failed outright.
    async fn create_webhook(&self, full_name: &str, payload: &WebhookPayload) -> Result<(), Error>;
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
