//! Error types for the loader.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::counter::CountError;
use super::deadline::Interrupt;
use crate::config::ConfigError;

/// Errors raised while constructing a [`Loader`](super::Loader).
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The fetch configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Category of a [`FetchError`], for matching without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    InvalidUrl,
    ConnectionFailure,
    Timeout,
    MissingSizeMetadata,
    BodyReadFailure,
    Cancelled,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchErrorKind::InvalidUrl => "invalid URL",
            FetchErrorKind::ConnectionFailure => "connection failure",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::MissingSizeMetadata => "missing size metadata",
            FetchErrorKind::BodyReadFailure => "body read failure",
            FetchErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Per-URL fetch failure. Every variant carries the URL it applies to.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be turned into a request.
    #[error("failed to create request for {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// DNS, TCP, TLS or HTTP protocol failure before a response arrived.
    #[error("failed to load {url}: {reason}")]
    ConnectionFailure { url: String, reason: String },

    /// The per-request deadline elapsed.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// HEAD mode only: `Content-Length` is absent or not a number.
    #[error("no size for {url}: {reason}")]
    MissingSizeMetadata { url: String, reason: String },

    /// The body stream failed before end of stream.
    #[error("failed to read body of {url} after {bytes} bytes: {reason}")]
    BodyReadFailure {
        url: String,
        bytes: u64,
        reason: String,
    },

    /// The lifetime token was cancelled while the fetch was in flight.
    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    /// The URL this error applies to.
    pub fn url(&self) -> &str {
        match self {
            FetchError::InvalidUrl { url, .. }
            | FetchError::ConnectionFailure { url, .. }
            | FetchError::Timeout { url, .. }
            | FetchError::MissingSizeMetadata { url, .. }
            | FetchError::BodyReadFailure { url, .. }
            | FetchError::Cancelled { url } => url,
        }
    }

    /// The error category.
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::InvalidUrl { .. } => FetchErrorKind::InvalidUrl,
            FetchError::ConnectionFailure { .. } => FetchErrorKind::ConnectionFailure,
            FetchError::Timeout { .. } => FetchErrorKind::Timeout,
            FetchError::MissingSizeMetadata { .. } => FetchErrorKind::MissingSizeMetadata,
            FetchError::BodyReadFailure { .. } => FetchErrorKind::BodyReadFailure,
            FetchError::Cancelled { .. } => FetchErrorKind::Cancelled,
        }
    }

    pub(crate) fn interrupted(url: &str, reason: Interrupt, timeout: Duration) -> Self {
        match reason {
            Interrupt::Cancelled => FetchError::Cancelled {
                url: url.to_string(),
            },
            Interrupt::TimedOut => FetchError::Timeout {
                url: url.to_string(),
                timeout,
            },
        }
    }

    pub(crate) fn from_reqwest(url: &str, error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_builder() {
            FetchError::InvalidUrl {
                url: url.to_string(),
                reason: error_chain(&error),
            }
        } else if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            FetchError::ConnectionFailure {
                url: url.to_string(),
                reason: error_chain(&error),
            }
        }
    }

    pub(crate) fn from_count(url: &str, error: CountError, timeout: Duration) -> Self {
        match error {
            CountError::Interrupted { reason, .. } => Self::interrupted(url, reason, timeout),
            CountError::Read { bytes, source } => FetchError::BodyReadFailure {
                url: url.to_string(),
                bytes,
                reason: error_chain(&source),
            },
        }
    }
}

// reqwest's top-level message is generic ("error sending request"); the
// useful detail lives in the source chain.
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
