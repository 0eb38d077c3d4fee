//! Command-line arguments.
//!
//! Every run setting can be given as a flag or through the environment variable
//! named next to it. Values from a `.env` file count as environment variables.

use std::path::PathBuf;

use bitbucket_client::{DEFAULT_API_BASE_URL, DEFAULT_AUTH_BASE_URL};
use clap::{Parser, ValueEnum};

/// HookRoller CLI: add a webhook to every repository of a Bitbucket account
#[derive(Parser, Debug)]
#[command(name = "hook-roller", version)]
#[command(
    about = "Add a webhook to every repository of a Bitbucket account",
    long_about = None
)]
pub struct Cli {
    /// OAuth consumer key
    #[arg(long, env = "BITBUCKET_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// OAuth consumer secret
    #[arg(long, env = "BITBUCKET_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Account whose repositories receive the webhook
    #[arg(long, env = "BITBUCKET_USERNAME")]
    pub username: Option<String>,

    /// Comma-separated event identifiers, e.g. `repo:push,issue:created`
    #[arg(long, env = "WEBHOOK_EVENTS")]
    pub events: Option<String>,

    /// Callback URL of the webhook
    #[arg(long = "url", env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Webhook description; `{REPO_NAME}` is replaced by the repository name
    #[arg(long, env = "WEBHOOK_DESCRIPTION", default_value = "")]
    pub description: String,

    /// Whether the webhook is created active (true/false, 1/0, t/f)
    #[arg(long, env = "WEBHOOK_ACTIVE")]
    pub active: Option<String>,

    /// Pause between two webhook creations, in milliseconds
    #[arg(long, env = "WEBHOOK_DELAY_MS", default_value_t = 1000)]
    pub delay_ms: u64,

    /// Create the webhook without looking for an existing one first
    #[arg(long)]
    pub skip_existing_check: bool,

    /// Authenticate and list repositories without creating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Base URL of the REST API
    #[arg(long, default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Base URL of the OAuth2 token endpoint
    #[arg(long, default_value = DEFAULT_AUTH_BASE_URL)]
    pub auth_base_url: String,

    /// Env file to load; defaults to `.env` if present
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Report output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
