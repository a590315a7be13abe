//! Error types for the Trello client.
//!
//! Every operation returns [`TrelloError`]. The variants line up with the four
//! failure classes callers care about; [`TrelloError::kind`] exposes that class
//! without matching on payloads.

use thiserror::Error;

/// Coarse classification of a [`TrelloError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid credentials or settings, detected at construction.
    Configuration,
    /// Non-2xx response (other than rate limiting) or a transport failure.
    Api,
    /// 429 responses that outlasted the retry budget.
    RateLimit,
    /// Malformed input rejected before any request was issued.
    Validation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Api => "api",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Validation => "validation",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`crate::client::TrelloClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrelloError {
    /// Credentials or settings are missing or unusable.
    #[error("Configuration error: {message}")]
    Configuration {
        /// What is wrong with the configuration.
        message: String,
    },

    /// Trello answered with a non-success status, the body could not be decoded,
    /// or the request never got a response.
    #[error("Trello API error ({}): {body}", .status.map_or_else(|| "no response".to_string(), |s| s.to_string()))]
    Api {
        /// Last observed HTTP status; `None` when the transport failed.
        status: Option<u16>,
        /// Last observed response body, or the transport error text.
        body: String,
    },

    /// Still rate limited after the retry budget was spent.
    #[error("Trello rate limit exceeded{}", .retry_after.map_or_else(String::new, |s| format!(", retry after {s}s")))]
    RateLimited {
        /// Advisory wait from the last `Retry-After` header, in seconds.
        retry_after: Option<u64>,
        /// Body of the last 429 response.
        body: String,
    },

    /// Input rejected locally.
    #[error("Invalid input: {message}")]
    Validation {
        /// Which argument was rejected and why.
        message: String,
    },
}

impl TrelloError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrelloError::Configuration { .. } => ErrorKind::Configuration,
            TrelloError::Api { .. } => ErrorKind::Api,
            TrelloError::RateLimited { .. } => ErrorKind::RateLimit,
            TrelloError::Validation { .. } => ErrorKind::Validation,
        }
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            TrelloError::Api { status, .. } => *status,
            TrelloError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        TrelloError::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        TrelloError::Validation {
            message: message.into(),
        }
    }
}
