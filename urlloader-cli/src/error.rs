//! CLI error type.

use std::fmt;
use std::io;

use urlloader::config::ConfigError;
use urlloader::loader::LoaderError;

/// Errors that abort the run. Per-URL failures are never surfaced here.
#[derive(Debug)]
pub enum CliError {
    /// Configuration file or flag values are invalid.
    Config(ConfigError),

    /// The HTTP loader could not be constructed.
    Loader(LoaderError),

    /// Logging could not be initialised.
    Logging(String),

    /// The interrupt handler could not be installed.
    Signal(String),

    /// The async runtime could not be started.
    Runtime(io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "{}", e),
            CliError::Loader(e) => write!(f, "{}", e),
            CliError::Logging(msg) => write!(f, "failed to initialise logging: {}", msg),
            CliError::Signal(msg) => write!(f, "failed to set signal handler: {}", msg),
            CliError::Runtime(e) => write!(f, "failed to start runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Loader(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Logging(_) | CliError::Signal(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<LoaderError> for CliError {
    fn from(e: LoaderError) -> Self {
        CliError::Loader(e)
    }
}
