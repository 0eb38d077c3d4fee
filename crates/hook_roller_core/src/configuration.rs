//! Run configuration.
//!
//! A [`ConfigurationContext`] is built once at startup and handed by reference to
//! every stage of the pipeline. Nothing in this crate reads process state.

use std::time::Duration;

use bitbucket_client::{ApiEndpoints, ClientCredentials, EventSpec};
use secrecy::ExposeSecret;

use crate::{HookRollerError, HookRollerResult};

#[cfg(test)]
#[path = "configuration_tests.rs"]
mod tests;

/// Placeholder in the description template replaced by the repository name.
pub const REPO_NAME_PLACEHOLDER: &str = "{REPO_NAME}";

/// Pause between two successive webhook creations.
pub const DEFAULT_PROVISION_INTERVAL: Duration = Duration::from_secs(1);

/// The webhook to create on every repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    /// Callback URL. Also the key for the "already provisioned" check.
    pub url: String,

    /// Description, optionally containing [`REPO_NAME_PLACEHOLDER`].
    pub description_template: String,

    pub active: bool,
}

impl WebhookSettings {
    /// Renders the description for one repository.
    ///
    /// Substitution happens once; a repository name that itself contains the
    /// placeholder is inserted literally.
    pub fn description_for(&self, repository_name: &str) -> String {
        self.description_template
            .replace(REPO_NAME_PLACEHOLDER, repository_name)
    }
}

/// Everything a provisioning run needs to know.
///
/// # Examples
///
/// ```rust
/// use bitbucket_client::{ClientCredentials, EventSpec};
/// use hook_roller_core::{ConfigurationContext, WebhookSettings};
///
/// let config = ConfigurationContext::builder(
///     ClientCredentials::new("key", "secret"),
///     "acme",
///     EventSpec::parse_list("repo:push").unwrap(),
///     WebhookSettings {
///         url: "https://ci.example.com/hook".to_string(),
///         description_template: "CI for {REPO_NAME}".to_string(),
///         active: true,
///     },
/// )
/// .dry_run(true)
/// .build()
/// .unwrap();
///
/// assert_eq!(config.username(), "acme");
/// assert!(config.dry_run());
/// ```
#[derive(Debug)]
pub struct ConfigurationContext {
    credentials: ClientCredentials,
    username: String,
    events: Vec<EventSpec>,
    webhook: WebhookSettings,
    endpoints: ApiEndpoints,
    check_existing: bool,
    dry_run: bool,
    provision_interval: Duration,
}

impl ConfigurationContext {
    /// Starts building a configuration from the required settings.
    pub fn builder(
        credentials: ClientCredentials,
        username: impl Into<String>,
        events: Vec<EventSpec>,
        webhook: WebhookSettings,
    ) -> ConfigurationContextBuilder {
        ConfigurationContextBuilder {
            config: Self {
                credentials,
                username: username.into(),
                events,
                webhook,
                endpoints: ApiEndpoints::default(),
                check_existing: true,
                dry_run: false,
                provision_interval: DEFAULT_PROVISION_INTERVAL,
            },
        }
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// The account whose repositories are provisioned.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn events(&self) -> &[EventSpec] {
        &self.events
    }

    /// Event identifiers in the form sent to Bitbucket.
    pub fn event_identifiers(&self) -> Vec<String> {
        self.events.iter().map(|e| e.as_str().to_string()).collect()
    }

    pub fn webhook(&self) -> &WebhookSettings {
        &self.webhook
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Whether existing webhooks are checked before creating one.
    pub fn check_existing(&self) -> bool {
        self.check_existing
    }

    /// Whether the run stops after enumeration without creating anything.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn provision_interval(&self) -> Duration {
        self.provision_interval
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `HookRollerError::Configuration` for the first problem found.
    pub fn validate(&self) -> HookRollerResult<()> {
        if self.credentials.key().trim().is_empty() {
            return Err(HookRollerError::configuration("consumer key is empty"));
        }

        if self.credentials.secret().expose_secret().trim().is_empty() {
            return Err(HookRollerError::configuration("consumer secret is empty"));
        }

        if self.username.trim().is_empty() {
            return Err(HookRollerError::configuration("username is empty"));
        }

        if self.events.is_empty() {
            return Err(HookRollerError::configuration(
                "at least one webhook event is required",
            ));
        }

        if self.webhook.url.trim().is_empty() {
            return Err(HookRollerError::configuration("webhook URL is empty"));
        }

        Ok(())
    }
}

/// Builder for [`ConfigurationContext`].
#[derive(Debug)]
pub struct ConfigurationContextBuilder {
    config: ConfigurationContext,
}

impl ConfigurationContextBuilder {
    pub fn endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.config.endpoints = endpoints;
        self
    }

    pub fn check_existing(mut self, check_existing: bool) -> Self {
        self.config.check_existing = check_existing;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    pub fn provision_interval(mut self, interval: Duration) -> Self {
        self.config.provision_interval = interval;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    /// Returns `HookRollerError::Configuration` if validation fails.
    pub fn build(self) -> HookRollerResult<ConfigurationContext> {
        self.config.validate()?;
        Ok(self.config)
    }
}
