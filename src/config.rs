//! Client configuration.
//!
//! Credentials are read once, at startup, into a [`TrelloConfig`] that is handed to
//! [`crate::client::TrelloClient::new`]. Nothing inside the client reads the
//! process environment.

use std::time::Duration;

use crate::client::retry::RetryPolicy;
use crate::error::TrelloError;

pub const DEFAULT_BASE_URL: &str = "https://api.trello.com/1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const ENV_API_KEY: &str = "TRELLO_API_KEY";
pub const ENV_OAUTH_TOKEN: &str = "TRELLO_OAUTH_TOKEN";
pub const ENV_BASE_URL: &str = "TRELLO_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "TRELLO_TIMEOUT_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "TRELLO_MAX_ATTEMPTS";

/// Everything the client needs to talk to Trello.
#[derive(Clone)]
pub struct TrelloConfig {
    /// Trello API key, sent as the `key` query parameter.
    pub api_key: String,
    /// OAuth token, sent as the `token` query parameter.
    pub token: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

// Keep secrets out of logs and panic messages.
impl std::fmt::Debug for TrelloConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrelloConfig")
            .field("api_key", &preview(&self.api_key))
            .field("token", &preview(&self.token))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl TrelloConfig {
    pub fn new(api_key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, TrelloError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// `TRELLO_API_KEY` and `TRELLO_OAUTH_TOKEN` are mandatory. The remaining
    /// variables fall back to defaults when unset but must parse when present.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TrelloError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ENV_API_KEY).unwrap_or_default();
        let token = lookup(ENV_OAUTH_TOKEN).unwrap_or_default();
        let mut config = Self::new(api_key, token);

        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                TrelloError::config(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds, got '{raw}'"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            // Counts the first try, so 1 disables retries.
            let attempts = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    TrelloError::config(format!(
                        "{ENV_MAX_ATTEMPTS} must be a positive integer, got '{raw}'"
                    ))
                })?;
            config.retry.max_attempts = attempts;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the client cannot work with.
    pub fn validate(&self) -> Result<(), TrelloError> {
        if self.api_key.trim().is_empty() {
            return Err(TrelloError::config(format!(
                "Missing Trello API key (set {ENV_API_KEY})"
            )));
        }
        if self.token.trim().is_empty() {
            return Err(TrelloError::config(format!(
                "Missing Trello OAuth token (set {ENV_OAUTH_TOKEN})"
            )));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(TrelloError::config(format!(
                "Trello base URL must be http(s), got '{}'",
                self.base_url
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(TrelloError::config("Retry policy needs at least one attempt"));
        }
        if self.timeout.is_zero() {
            return Err(TrelloError::config("Request timeout must be greater than zero"));
        }
        Ok(())
    }

    pub fn token_preview(&self) -> String {
        preview(&self.token)
    }
}

fn preview(secret: &str) -> String {
    let head: String = secret.chars().take(4).collect();
    format!("{}...", head)
}
