//! Error types for Bitbucket client operations.
//!
//! This module defines the errors that can occur when talking to the Bitbucket
//! Cloud REST API or its OAuth2 token endpoint. Transport failures, unexpected
//! HTTP status codes and malformed response bodies are kept apart so callers can
//! decide which of them are fatal.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during Bitbucket client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use bitbucket_client::Error;
///
/// match client.list_repositories_page("acme", 1).await {
///     Ok(page) => println!("{} repositories", page.values.len()),
///     Err(Error::UnexpectedStatus { status, .. }) => eprintln!("HTTP {}", status),
///     Err(err) => eprintln!("Other error: {}", err),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTP client could not be constructed.
    #[error("Failed to build the HTTP client: {0}")]
    ClientBuild(String),

    /// Error deserializing a response body from Bitbucket.
    ///
    /// This usually means the API returned a body that doesn't match the
    /// documented schema.
    #[error("Failed to deserialize Bitbucket response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A configured endpoint could not be parsed as a URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request never produced an HTTP response.
    ///
    /// Covers DNS failures, refused connections, TLS errors and timeouts.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Bitbucket answered with a status code other than the expected one.
    ///
    /// `operation` names the call that failed, e.g. `create webhook`.
    #[error("{operation} request failed. Status code: {status}")]
    UnexpectedStatus { operation: String, status: u16 },
}

impl Error {
    /// Returns the HTTP status code if the error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the request failed before a response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
