//! Configuration for the loader, the dispatch pipeline and the URL readers.
//!
//! All configuration is built once at startup and passed explicitly into the
//! components that need it. Values are resolved in three layers:
//!
//! 1. Built-in defaults (the `Default` impls in this module)
//! 2. The optional INI file ([`ConfigFile`])
//! 3. Command-line flags (applied by the CLI)

mod duration;
mod file;

use std::time::Duration;

use thiserror::Error;

pub use duration::{format_duration, parse_duration};
pub use file::{config_file_path, ConfigFile, LoaderSection, ReaderSection};

/// Default read buffer size for draining response bodies (32 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors raised while building or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A duration string could not be parsed.
    #[error("invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: String },

    /// A configuration value is out of range or malformed.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// The configuration file could not be read or parsed.
    #[error("failed to load config file {path}: {source}")]
    FileLoad {
        path: String,
        #[source]
        source: ini::Error,
    },

    /// No inputs were given to read URLs from.
    #[error("at least one filename is required")]
    NoInputs,
}

impl ConfigError {
    pub(crate) fn invalid_value(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Fetch Configuration
// =============================================================================

/// Configuration for a single fetch operation, shared by every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Upper bound on the whole request, body included.
    pub timeout: Duration,

    /// Chunk size used when draining response bodies.
    ///
    /// Zero is treated as [`DEFAULT_BUFFER_SIZE`].
    pub buffer_size: usize,

    /// Issue HEAD and trust `Content-Length` instead of downloading the body.
    pub use_head: bool,

    /// Follow redirect responses. When disabled the first redirect is final.
    pub follow_redirects: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            use_head: false,
            follow_redirects: true,
        }
    }
}

impl FetchConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the body read buffer size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Enable or disable HEAD mode.
    pub fn with_use_head(mut self, use_head: bool) -> Self {
        self.use_head = use_head;
        self
    }

    /// Enable or disable redirect following.
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Buffer size actually used for reads.
    pub fn effective_buffer_size(&self) -> usize {
        if self.buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            self.buffer_size
        }
    }

    /// Check that the configuration can be used to fetch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid_value("timeout", "must be greater than zero"));
        }
        Ok(())
    }
}

// =============================================================================
// Dispatch Configuration
// =============================================================================

/// Configuration for the dispatch pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Number of concurrent fetch workers.
    pub workers: usize,

    /// Capacity of the dispatch queue. `None` uses the worker count.
    pub queue_capacity: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: available_parallelism(),
            queue_capacity: None,
        }
    }
}

impl DispatchConfig {
    /// Create a configuration with the given worker count.
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            queue_capacity: None,
        }
    }

    /// Set an explicit queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Queue capacity actually used, never less than one.
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers).max(1)
    }

    /// Check that the pipeline can be started with this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::invalid_value("parallel", "must be at least 1"));
        }
        if self.queue_capacity == Some(0) {
            return Err(ConfigError::invalid_value("queue", "must be at least 1"));
        }
        Ok(())
    }
}

// =============================================================================
// Reader Configuration
// =============================================================================

/// Configuration for the URL inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Leading lines to skip in every input.
    pub skip: u64,

    /// Input names; `-` reads standard input.
    pub inputs: Vec<String>,
}

impl ReaderConfig {
    /// Create a reader configuration for the given inputs.
    pub fn new(inputs: Vec<String>) -> Self {
        Self { skip: 0, inputs }
    }

    /// Set the number of leading lines to skip.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inputs.is_empty() {
            return Err(ConfigError::NoInputs);
        }
        Ok(())
    }
}

/// Number of CPUs available to the process, at least one.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert!(!config.use_head);
        assert!(config.follow_redirects);
    }

    #[test]
    fn test_omitted_buffer_matches_explicit_default() {
        let omitted = FetchConfig::new().with_buffer_size(0);
        let explicit = FetchConfig::new().with_buffer_size(32768);
        assert_eq!(
            omitted.effective_buffer_size(),
            explicit.effective_buffer_size()
        );
        assert_eq!(omitted.effective_buffer_size(), 32768);
    }

    #[test]
    fn test_fetch_config_builder() {
        let config = FetchConfig::new()
            .with_timeout(Duration::from_millis(250))
            .with_buffer_size(1024)
            .with_use_head(true)
            .with_follow_redirects(false);

        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.effective_buffer_size(), 1024);
        assert!(config.use_head);
        assert!(!config.follow_redirects);
    }

    #[test]
    fn test_fetch_config_rejects_zero_timeout() {
        let config = FetchConfig::new().with_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_dispatch_config_queue_defaults_to_workers() {
        let config = DispatchConfig::new(6);
        assert_eq!(config.effective_queue_capacity(), 6);

        let config = DispatchConfig::new(6).with_queue_capacity(64);
        assert_eq!(config.effective_queue_capacity(), 64);
    }

    #[test]
    fn test_dispatch_config_validation() {
        assert!(DispatchConfig::default().validate().is_ok());
        assert!(DispatchConfig::new(0).validate().is_err());
        assert!(DispatchConfig::new(2)
            .with_queue_capacity(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_reader_config_requires_inputs() {
        assert!(matches!(
            ReaderConfig::default().validate(),
            Err(ConfigError::NoInputs)
        ));
        let config = ReaderConfig::new(vec!["urls.txt".to_string()]).with_skip(3);
        assert!(config.validate().is_ok());
        assert_eq!(config.skip, 3);
    }
}
