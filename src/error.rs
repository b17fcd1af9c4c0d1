//! Error types shared across the monitor

use thiserror::Error;

/// Failure fetching or decoding exchange market data
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl MarketDataError {
    /// Transport failures, rate limiting and server errors are worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            MarketDataError::Http(_) => true,
            MarketDataError::Api { status, .. } => *status == 429 || *status >= 500,
            MarketDataError::Malformed(_) => false,
        }
    }
}

/// Failure sending or editing an alert
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("Telegram API error: {description}")]
    Api { description: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Drops the request URL, which carries the bot token
impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Http(e.without_url())
    }
}

/// Invalid or missing process configuration. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key} ({value:?}): {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure appending to the audit log
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
