//! Scope checks run before any webhook is created.
//!
//! Two independent checks exist: one against a fixed base set that every run
//! needs, and one against the scopes implied by the categories of the
//! requested webhook events. Both report every missing requirement at once.

use std::collections::HashSet;
use std::fmt;

use bitbucket_client::{AccessToken, EventCategory, EventSpec};
use tracing::{debug, warn};

use crate::{AuthError, AuthResult};

#[cfg(test)]
#[path = "scopes_tests.rs"]
mod tests;

/// Scopes every provisioning run needs, in the order they are reported.
pub const BASE_SCOPES: [&str; 4] = [
    "account:write",
    "webhook",
    "repository:write",
    "project:write",
];

/// The set of scopes granted on an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSet {
    scopes: HashSet<String>,
}

impl ScopeSet {
    /// Parses a space-delimited scope string.
    pub fn parse(scopes: &str) -> Self {
        Self {
            scopes: scopes.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl From<&AccessToken> for ScopeSet {
    fn from(token: &AccessToken) -> Self {
        Self::parse(token.scopes())
    }
}

/// A single requirement on a [`ScopeSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRequirement {
    /// The named scope must be present.
    Scope(&'static str),
    /// At least one of the named scopes must be present.
    AnyOf(&'static [&'static str]),
}

impl ScopeRequirement {
    /// Returns the extra requirement implied by an event category, if any.
    ///
    /// Categories other than `repo`, `issue` and `pullrequest` are not checked.
    pub fn for_category(category: &EventCategory) -> Option<Self> {
        match category {
            EventCategory::Repository => {
                Some(Self::AnyOf(&["repository:write", "repository:admin"]))
            }
            EventCategory::Issue => Some(Self::Scope("issues:write")),
            EventCategory::PullRequest => Some(Self::Scope("pullrequest:write")),
            EventCategory::Other(_) => None,
        }
    }

    pub fn is_satisfied_by(&self, scopes: &ScopeSet) -> bool {
        match self {
            Self::Scope(scope) => scopes.contains(scope),
            Self::AnyOf(options) => options.iter().any(|scope| scopes.contains(scope)),
        }
    }
}

impl fmt::Display for ScopeRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scope(scope) => f.write_str(scope),
            Self::AnyOf(options) => f.write_str(&options.join(" or ")),
        }
    }
}

/// Checks the token scopes against [`BASE_SCOPES`].
///
/// # Errors
/// Returns `AuthError::MissingScopes` naming every missing base scope, in
/// declaration order.
pub fn check_base_scopes(scopes: &ScopeSet) -> AuthResult<()> {
    let missing: Vec<String> = BASE_SCOPES
        .iter()
        .filter(|scope| !scopes.contains(scope))
        .map(|scope| scope.to_string())
        .collect();

    if !missing.is_empty() {
        warn!(missing = ?missing, "Access token lacks base scopes");
        return Err(AuthError::MissingScopes { missing });
    }

    debug!("Base scopes present");
    Ok(())
}

/// Checks the token scopes against the categories of the requested events.
///
/// Each unmet requirement is reported once, however many requested events
/// share its category.
///
/// # Errors
/// Returns `AuthError::MissingScopes` listing every unmet requirement in the
/// order its category first appears in `events`.
pub fn check_event_scopes(scopes: &ScopeSet, events: &[EventSpec]) -> AuthResult<()> {
    let mut missing: Vec<String> = Vec::new();

    for event in events {
        let Some(requirement) = ScopeRequirement::for_category(event.category()) else {
            continue;
        };

        if requirement.is_satisfied_by(scopes) {
            continue;
        }

        let description = requirement.to_string();
        if !missing.contains(&description) {
            missing.push(description);
        }
    }

    if !missing.is_empty() {
        warn!(missing = ?missing, "Access token lacks scopes for the requested events");
        return Err(AuthError::MissingScopes { missing });
    }

    debug!(event_count = events.len(), "Event scopes present");
    Ok(())
}
