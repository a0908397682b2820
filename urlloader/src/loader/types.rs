//! Value types produced by the loader.

use std::time::Duration;

/// Outcome of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// The URL as it was read from the input.
    pub url: String,

    /// Payload size in bytes (counted body bytes, or `Content-Length` in HEAD mode).
    pub size: u64,

    /// Time from sending the request until the size was fully determined.
    pub elapsed: Duration,
}

impl FetchResult {
    pub fn new(url: impl Into<String>, size: u64, elapsed: Duration) -> Self {
        Self {
            url: url.into(),
            size,
            elapsed,
        }
    }
}
