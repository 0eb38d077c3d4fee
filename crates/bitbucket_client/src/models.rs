//! # Models
//!
//! This module contains the wire models exchanged with Bitbucket Cloud: the
//! OAuth2 token response, repositories and pages of repositories.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// The key and secret of a Bitbucket OAuth consumer.
///
/// The secret is never printed by the `Debug` implementation.
#[derive(Debug)]
pub struct ClientCredentials {
    key: String,
    secret: SecretString,
}

impl ClientCredentials {
    /// Creates a new set of consumer credentials.
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// The consumer key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The consumer secret.
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }
}

/// Raw token endpoint response, converted into an [`AccessToken`] immediately
/// so the token value only ever lives inside a `SecretString`.
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    scopes: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: String,
}

/// An OAuth2 access token issued by the Bitbucket token endpoint.
///
/// An empty token value means the exchange did not really succeed; callers
/// must check [`AccessToken::is_empty`] before using it.
#[derive(Debug)]
pub struct AccessToken {
    access_token: SecretString,
    scopes: String,
    expires_in: u64,
    refresh_token: Option<SecretString>,
    token_type: String,
}

impl AccessToken {
    /// Creates a token from its parts. Mostly useful in tests.
    pub fn new(access_token: impl Into<String>, scopes: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            scopes: scopes.into(),
            expires_in: 0,
            refresh_token: None,
            token_type: "bearer".to_string(),
        }
    }

    /// Returns true if the token endpoint handed back an empty token.
    pub fn is_empty(&self) -> bool {
        self.access_token.expose_secret().is_empty()
    }

    /// The secret token value, for use in `Authorization` headers.
    pub fn secret(&self) -> &SecretString {
        &self.access_token
    }

    /// The space-delimited scopes granted on the token.
    pub fn scopes(&self) -> &str {
        &self.scopes
    }

    /// Lifetime of the token in seconds.
    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }

    /// The refresh token, if the endpoint issued one.
    pub fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }

    /// The token type, normally `bearer`.
    pub fn token_type(&self) -> &str {
        &self.token_type
    }
}

impl From<TokenResponse> for AccessToken {
    fn from(value: TokenResponse) -> Self {
        Self {
            access_token: SecretString::from(value.access_token),
            scopes: value.scopes,
            expires_in: value.expires_in,
            refresh_token: value.refresh_token.map(SecretString::from),
            token_type: value.token_type,
        }
    }
}

/// A repository as returned by the repository listing endpoint.
///
/// The listing request excludes most fields, so only the ones below are
/// populated.
///
/// # Examples
///
/// ```rust
/// use bitbucket_client::Repository;
///
/// let json = r#"{
///     "scm": "git",
///     "uuid": "{c3b0ad5b-5c4f-4a4e-9a0b-2f9e3c5d1a11}",
///     "description": "",
///     "full_name": "acme/widgets",
///     "is_private": true,
///     "name": "widgets"
/// }"#;
///
/// let repo: Repository = serde_json::from_str(json).unwrap();
/// assert_eq!(repo.full_name, "acme/widgets");
/// assert!(repo.is_private);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Source control type, `git` on current Bitbucket Cloud.
    #[serde(default)]
    pub scm: String,

    /// Bitbucket-assigned unique identifier.
    #[serde(default)]
    pub uuid: String,

    #[serde(default)]
    pub description: String,

    /// `owner/slug`, used to build per-repository endpoints.
    pub full_name: String,

    #[serde(default)]
    pub is_private: bool,

    /// Display name.
    pub name: String,
}

/// One page of the repository listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPage {
    /// Repositories on this page.
    #[serde(default)]
    pub values: Vec<Repository>,

    /// Total number of repositories across all pages.
    #[serde(default)]
    pub size: Option<u64>,

    /// Page size the server applied.
    #[serde(default)]
    pub pagelen: Option<u32>,

    /// One-based index of this page.
    #[serde(default)]
    pub page: Option<u32>,

    /// Link to the next page; absent on the last page.
    #[serde(default)]
    pub next: Option<String>,

    #[serde(default)]
    pub previous: Option<String>,
}
