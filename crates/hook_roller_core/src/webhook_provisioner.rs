//! Webhook provisioning for enumerated repositories.
//!
//! This module provides the [`WebhookProvisioner`] component, which creates the
//! configured webhook on each repository one at a time. A failure on one
//! repository is recorded and the batch moves on to the next.

use bitbucket_client::{Repository, RepositoryClient, WebhookPayload};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::configuration::WebhookSettings;
use crate::rate_limit::RateLimiter;
use crate::{HookRollerError, HookRollerResult};

#[cfg(test)]
#[path = "webhook_provisioner_tests.rs"]
mod tests;

/// What happened to a single repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionOutcome {
    /// A new webhook was created.
    Created,

    /// A webhook with the configured URL was already present.
    AlreadyPresent,
}

/// Receives the result of each repository as soon as it is known.
///
/// Both methods default to doing nothing.
pub trait ProvisionObserver: Send + Sync {
    /// Called after a repository was handled without error.
    fn repository_provisioned(&self, _repository: &Repository, _outcome: ProvisionOutcome) {}

    /// Called after provisioning a repository failed.
    fn repository_failed(&self, _repository: &Repository, _error: &HookRollerError) {}
}

/// Observer that ignores every result.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProvisionObserver for NoopObserver {}

/// Creates the configured webhook on repositories.
///
/// # Examples
///
/// ```rust,no_run
/// use bitbucket_client::BitbucketClient;
/// use hook_roller_core::{rate_limit::Unpaced, WebhookProvisioner, WebhookSettings};
///
/// # async fn example(client: BitbucketClient, repos: Vec<bitbucket_client::Repository>) {
/// let settings = WebhookSettings {
///     url: "https://ci.example.com/hook".to_string(),
///     description_template: "CI for {REPO_NAME}".to_string(),
///     active: true,
/// };
///
/// let provisioner = WebhookProvisioner::new(
///     &client,
///     &settings,
///     vec!["repo:push".to_string()],
///     Box::new(Unpaced),
/// );
/// let summary = provisioner.provision_all(&repos).await;
/// println!("Created: {}, failed: {}", summary.created, summary.failed);
/// # }
/// ```
pub struct WebhookProvisioner<'a, C: RepositoryClient + ?Sized> {
    client: &'a C,
    settings: &'a WebhookSettings,
    events: Vec<String>,
    limiter: Box<dyn RateLimiter + 'a>,
    check_existing: bool,
    observer: &'a dyn ProvisionObserver,
}

impl<'a, C: RepositoryClient + ?Sized> WebhookProvisioner<'a, C> {
    /// Creates a provisioner with the existing-webhook check enabled.
    pub fn new(
        client: &'a C,
        settings: &'a WebhookSettings,
        events: Vec<String>,
        limiter: Box<dyn RateLimiter + 'a>,
    ) -> Self {
        Self {
            client,
            settings,
            events,
            limiter,
            check_existing: true,
            observer: &NoopObserver,
        }
    }

    /// Reports each repository's result to `observer` while the batch runs.
    pub fn observer(mut self, observer: &'a dyn ProvisionObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Enables or disables the existing-webhook check.
    pub fn check_existing(mut self, check_existing: bool) -> Self {
        self.check_existing = check_existing;
        self
    }

    /// Builds the creation payload for one repository.
    pub fn build_payload(&self, repository: &Repository) -> WebhookPayload {
        WebhookPayload {
            description: self.settings.description_for(&repository.name),
            url: self.settings.url.clone(),
            active: self.settings.active,
            events: self.events.clone(),
        }
    }

    /// Ensures the webhook exists on one repository.
    ///
    /// Waits on the rate limiter first. When the existence check is enabled and
    /// a webhook with the configured URL is already there, nothing is created.
    ///
    /// # Errors
    ///
    /// Returns `HookRollerError::Provision` if listing the existing webhooks or
    /// creating the new one fails.
    #[instrument(skip(self, repository), fields(repository = %repository.full_name))]
    pub async fn provision(&self, repository: &Repository) -> HookRollerResult<ProvisionOutcome> {
        self.limiter.acquire().await;

        if self.check_existing {
            let urls = self
                .client
                .list_webhook_urls(&repository.full_name)
                .await
                .map_err(|e| HookRollerError::provision(&repository.full_name, e))?;

            if urls.iter().any(|url| url == &self.settings.url) {
                debug!("Webhook already present");
                return Ok(ProvisionOutcome::AlreadyPresent);
            }
        }

        let payload = self.build_payload(repository);
        self.client
            .create_webhook(&repository.full_name, &payload)
            .await
            .map_err(|e| HookRollerError::provision(&repository.full_name, e))?;

        Ok(ProvisionOutcome::Created)
    }

    /// Provisions every repository in order.
    ///
    /// Never fails as a whole: each repository's failure is logged and
    /// counted in the returned summary.
    pub async fn provision_all(&self, repositories: &[Repository]) -> ProvisionSummary {
        info!(
            repository_count = repositories.len(),
            url = %self.settings.url,
            "Provisioning webhooks"
        );

        let mut summary = ProvisionSummary::new();

        for repository in repositories {
            match self.provision(repository).await {
                Ok(outcome) => {
                    match outcome {
                        ProvisionOutcome::Created => {
                            info!(repository = %repository.full_name, "Added webhook");
                            summary.record_created(&repository.full_name);
                        }
                        ProvisionOutcome::AlreadyPresent => {
                            info!(
                                repository = %repository.full_name,
                                "Webhook already present, skipping"
                            );
                            summary.already_present += 1;
                        }
                    }
                    self.observer.repository_provisioned(repository, outcome);
                }
                Err(e) => {
                    warn!(
                        repository = %repository.full_name,
                        error = %e,
                        "Failed to provision webhook"
                    );
                    summary.record_failed(&repository.full_name);
                    self.observer.repository_failed(repository, &e);
                }
            }
        }

        info!(
            created = summary.created,
            already_present = summary.already_present,
            failed = summary.failed,
            "Webhook provisioning complete"
        );

        summary
    }
}

/// Result of provisioning a batch of repositories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionSummary {
    /// Number of webhooks created
    pub created: usize,

    /// Number of repositories that already had the webhook
    pub already_present: usize,

    /// Number of repositories that could not be provisioned
    pub failed: usize,

    /// Full names of the repositories that received a webhook, in order
    pub created_repositories: Vec<String>,

    /// Full names of the repositories that failed, in order
    pub failed_repositories: Vec<String>,
}

impl ProvisionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no repository failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Returns true if at least one webhook was created.
    pub fn has_changes(&self) -> bool {
        self.created > 0
    }

    /// Total number of repositories processed.
    pub fn total(&self) -> usize {
        self.created + self.already_present + self.failed
    }

    fn record_created(&mut self, full_name: &str) {
        self.created += 1;
        self.created_repositories.push(full_name.to_string());
    }

    fn record_failed(&mut self, full_name: &str) {
        self.failed += 1;
        self.failed_repositories.push(full_name.to_string());
    }
}
