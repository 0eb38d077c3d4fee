//! Bitbucket webhook types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;

/// The category of a webhook event, taken from the part of the event
/// identifier before the first `:`.
///
/// See [Bitbucket event payloads](https://support.atlassian.com/bitbucket-cloud/docs/event-payloads/).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// `repo:*` events, e.g. `repo:push`
    Repository,
    /// `issue:*` events, e.g. `issue:created`
    Issue,
    /// `pullrequest:*` events, e.g. `pullrequest:fulfilled`
    PullRequest,
    /// Any other category, e.g. `project:updated`
    Other(String),
}

impl EventCategory {
    /// Classifies a category prefix.
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "repo" => Self::Repository,
            "issue" => Self::Issue,
            "pullrequest" => Self::PullRequest,
            other => Self::Other(other.to_string()),
        }
    }

    /// Converts the category back to its prefix.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Repository => "repo",
            Self::Issue => "issue",
            Self::PullRequest => "pullrequest",
            Self::Other(prefix) => prefix,
        }
    }
}

/// A webhook event the user asked for, e.g. `repo:push`.
///
/// # Examples
///
/// ```rust
/// use bitbucket_client::{EventCategory, EventSpec};
///
/// let event: EventSpec = "pullrequest:created".parse().unwrap();
/// assert_eq!(event.as_str(), "pullrequest:created");
/// assert_eq!(event.category(), &EventCategory::PullRequest);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventSpec {
    identifier: String,
    category: EventCategory,
}

impl EventSpec {
    /// The full event identifier as sent to Bitbucket.
    pub fn as_str(&self) -> &str {
        &self.identifier
    }

    /// The category derived from the identifier.
    pub fn category(&self) -> &EventCategory {
        &self.category
    }

    /// Parses a comma-separated list of event identifiers.
    ///
    /// Whitespace around entries is trimmed and empty entries are dropped.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, InvalidEventSpec> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::from_str)
            .collect()
    }
}

impl FromStr for EventSpec {
    type Err = InvalidEventSpec;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let identifier = s.trim();
        let prefix = identifier
            .split_once(':')
            .map(|(prefix, _)| prefix)
            .unwrap_or(identifier);

        if identifier.is_empty() || prefix.is_empty() {
            return Err(InvalidEventSpec(s.to_string()));
        }

        Ok(Self {
            identifier: identifier.to_string(),
            category: EventCategory::from_prefix(prefix),
        })
    }
}

impl fmt::Display for EventSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

/// An event identifier that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid webhook event identifier: '{0}'")]
pub struct InvalidEventSpec(pub String);

/// Request body for creating a webhook on a repository.
///
/// # Examples
///
/// ```rust
/// use bitbucket_client::WebhookPayload;
///
/// let payload = WebhookPayload {
///     description: "CI hook for widgets".to_string(),
///     url: "https://ci.example.com/hook".to_string(),
///     active: true,
///     events: vec!["repo:push".to_string()],
/// };
///
/// let json = serde_json::to_value(&payload).unwrap();
/// assert_eq!(json["events"][0], "repo:push");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub description: String,

    /// Callback URL Bitbucket will POST events to.
    pub url: String,

    pub active: bool,

    pub events: Vec<String>,
}

/// One page of `GET .../hooks?fields=values.url,next`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WebhookUrlPage {
    #[serde(default)]
    pub values: Vec<WebhookUrl>,

    /// Absolute URL of the following page, absent on the last one.
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WebhookUrl {
    #[serde(default)]
    pub url: String,
}

impl WebhookUrlPage {
    pub(crate) fn into_parts(self) -> (Vec<String>, Option<String>) {
        let urls = self.values.into_iter().map(|v| v.url).collect();
        (urls, self.next)
    }
}
