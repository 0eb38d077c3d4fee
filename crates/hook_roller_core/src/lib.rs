//! # HookRoller Core
//!
//! This crate provides the orchestration logic for HookRoller, a tool that puts
//! the same webhook on every repository of a Bitbucket account.
//!
//! ## Overview
//!
//! A run goes through four stages, strictly one after another:
//! 1. Exchange the consumer key and secret for an access token
//! 2. Check that the token carries the scopes the requested events need
//! 3. Enumerate every repository of the account, page by page
//! 4. Create the webhook on each repository that does not have it yet
//!
//! Stages 1 to 3 are all-or-nothing: any failure stops the run before a single
//! webhook is created. Stage 4 tolerates per-repository failures and reports
//! them in a [`ProvisionSummary`].
//!
//! ## Examples
//!
//! ```no_run
//! use bitbucket_client::{ClientCredentials, EventSpec};
//! use hook_roller_core::{provision_account_webhooks, ConfigurationContext, WebhookSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigurationContext::builder(
//!     ClientCredentials::new("consumer-key", "consumer-secret"),
//!     "my-team",
//!     EventSpec::parse_list("repo:push,pullrequest:created")?,
//!     WebhookSettings {
//!         url: "https://ci.example.com/hook".to_string(),
//!         description_template: "CI for {REPO_NAME}".to_string(),
//!         active: true,
//!     },
//! )
//! .build()?;
//!
//! let report = provision_account_webhooks(&config).await?;
//! println!("{} repositories processed", report.repository_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The network sits behind the [`bitbucket_client::RepositoryClient`] trait, so
//! [`provision_with_client`] can run the enumeration and provisioning stages
//! against any implementation. Pacing between webhook creations is a
//! [`rate_limit::RateLimiter`].

use auth_handler::{
    check_base_scopes, check_event_scopes, AuthenticationService, BitbucketAuthService, ScopeSet,
};
use bitbucket_client::{AccessToken, BitbucketClient, EventSpec, RepositoryClient};
use serde::Serialize;
use tracing::{info, instrument};

mod errors;
pub use errors::{HookRollerError, HookRollerResult};

pub mod configuration;
pub use configuration::{
    ConfigurationContext, ConfigurationContextBuilder, WebhookSettings, DEFAULT_PROVISION_INTERVAL,
    REPO_NAME_PLACEHOLDER,
};

pub mod rate_limit;

mod repository_enumerator;
pub use repository_enumerator::{page_count, RepositoryEnumerator};

mod webhook_provisioner;
pub use webhook_provisioner::{
    NoopObserver, ProvisionObserver, ProvisionOutcome, ProvisionSummary, WebhookProvisioner,
};

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Result of a complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunReport {
    /// Nothing was created; lists the repositories that would get the webhook.
    DryRun { repositories: Vec<String> },

    /// Webhooks were provisioned.
    Provisioned(ProvisionSummary),
}

impl RunReport {
    /// Number of repositories the run covered.
    pub fn repository_count(&self) -> usize {
        match self {
            RunReport::DryRun { repositories } => repositories.len(),
            RunReport::Provisioned(summary) => summary.total(),
        }
    }

    /// Returns true if no repository failed.
    pub fn is_success(&self) -> bool {
        match self {
            RunReport::DryRun { .. } => true,
            RunReport::Provisioned(summary) => summary.is_success(),
        }
    }
}

/// Runs the whole pipeline for the configured account.
///
/// # Errors
///
/// Returns the first fatal error:
/// - `HookRollerError::Configuration` if the configuration does not validate
/// - `HookRollerError::Authentication` or `EmptyAccessToken` if no usable token is obtained
/// - `HookRollerError::MissingScopes` if the token lacks a required scope
/// - `HookRollerError::RepositoryFetch` if any repository page cannot be read
/// - `HookRollerError::Transport` or `InvalidResponse` for network and parse failures
///
/// Per-repository provisioning failures are not errors; they are counted in
/// the returned report.
pub async fn provision_account_webhooks(
    config: &ConfigurationContext,
) -> HookRollerResult<RunReport> {
    provision_account_webhooks_with(config, &NoopObserver).await
}

/// Same as [`provision_account_webhooks`], reporting each repository's result
/// to `observer` as soon as it is known.
///
/// # Errors
/// See [`provision_account_webhooks`].
#[instrument(skip(config, observer), fields(username = %config.username()))]
pub async fn provision_account_webhooks_with(
    config: &ConfigurationContext,
    observer: &dyn ProvisionObserver,
) -> HookRollerResult<RunReport> {
    config.validate()?;

    let client =
        BitbucketClient::new(config.endpoints().clone()).map_err(HookRollerError::Transport)?;

    let token = BitbucketAuthService::new(&client)
        .authenticate(config.credentials())
        .await?;

    validate_token_scopes(&token, config.events())?;

    let api = client.with_access_token(&token);
    provision_with_client(&api, config, observer).await
}

/// Checks the base scopes, then the scopes required by the requested events.
///
/// # Errors
/// Returns `HookRollerError::MissingScopes` listing every missing scope of the
/// first check that fails.
pub fn validate_token_scopes(token: &AccessToken, events: &[EventSpec]) -> HookRollerResult<()> {
    let scopes = ScopeSet::from(token);
    info!(scope_count = scopes.len(), "Validating token scopes");

    check_base_scopes(&scopes)?;
    check_event_scopes(&scopes, events)?;
    Ok(())
}

/// Enumerates and provisions using an already authenticated client.
///
/// # Errors
/// Returns `HookRollerError::RepositoryFetch`, `Transport` or `InvalidResponse`
/// if the enumeration fails. Nothing is created in that case.
pub async fn provision_with_client<C: RepositoryClient + ?Sized>(
    client: &C,
    config: &ConfigurationContext,
    observer: &dyn ProvisionObserver,
) -> HookRollerResult<RunReport> {
    let repositories = RepositoryEnumerator::new(client)
        .list_all(config.username())
        .await?;

    if config.dry_run() {
        info!(
            repository_count = repositories.len(),
            "Dry run, no webhooks created"
        );
        return Ok(RunReport::DryRun {
            repositories: repositories.into_iter().map(|r| r.full_name).collect(),
        });
    }

    let provisioner = WebhookProvisioner::new(
        client,
        config.webhook(),
        config.event_identifiers(),
        rate_limit::limiter_for_interval(config.provision_interval()),
    )
    .check_existing(config.check_existing())
    .observer(observer);

    let summary = provisioner.provision_all(&repositories).await;
    Ok(RunReport::Provisioned(summary))
}
