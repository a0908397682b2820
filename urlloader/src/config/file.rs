//! INI configuration file.
//!
//! ```ini
//! [reader]
//! skip = 0
//!
//! [loader]
//! parallel = 8
//! timeout = 1s
//! redirects = true
//! buffer = 32768
//! use_head = false
//! queue = 16
//! ```
//!
//! Every key is optional; absent keys fall through to the built-in defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::{parse_duration, ConfigError, DispatchConfig, FetchConfig};

/// Values from the `[reader]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderSection {
    pub skip: Option<u64>,
}

/// Values from the `[loader]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderSection {
    pub parallel: Option<usize>,
    pub timeout: Option<Duration>,
    pub redirects: Option<bool>,
    pub buffer: Option<usize>,
    pub use_head: Option<bool>,
    pub queue: Option<usize>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub reader: ReaderSection,
    pub loader: LoaderSection,
}

/// Default location of the configuration file.
///
/// Returns `None` when the platform has no configuration directory.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("urlloader").join("config.ini"))
}

impl ConfigFile {
    /// Load a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::FileLoad {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Load the file at the default location if it exists.
    pub fn load_default() -> Result<Self, ConfigError> {
        match config_file_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse configuration from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::FileLoad {
            path: "<string>".to_string(),
            source: ini::Error::Parse(e),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("reader")) {
            config.reader.skip = parse_key(section, "reader.skip", "skip")?;
        }

        if let Some(section) = ini.section(Some("loader")) {
            config.loader.parallel = parse_key(section, "loader.parallel", "parallel")?;
            config.loader.redirects = parse_key(section, "loader.redirects", "redirects")?;
            config.loader.buffer = parse_key(section, "loader.buffer", "buffer")?;
            config.loader.use_head = parse_key(section, "loader.use_head", "use_head")?;
            config.loader.queue = parse_key(section, "loader.queue", "queue")?;
            config.loader.timeout = section
                .get("timeout")
                .map(parse_duration)
                .transpose()?;
        }

        Ok(config)
    }

    /// Fetch configuration with file values applied over the defaults.
    pub fn fetch_config(&self) -> FetchConfig {
        let defaults = FetchConfig::default();
        FetchConfig {
            timeout: self.loader.timeout.unwrap_or(defaults.timeout),
            buffer_size: self.loader.buffer.unwrap_or(defaults.buffer_size),
            use_head: self.loader.use_head.unwrap_or(defaults.use_head),
            follow_redirects: self.loader.redirects.unwrap_or(defaults.follow_redirects),
        }
    }

    /// Dispatch configuration with file values applied over the defaults.
    pub fn dispatch_config(&self) -> DispatchConfig {
        let defaults = DispatchConfig::default();
        DispatchConfig {
            workers: self.loader.parallel.unwrap_or(defaults.workers),
            queue_capacity: self.loader.queue.or(defaults.queue_capacity),
        }
    }
}

fn parse_key<T>(section: &Properties, key: &str, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    section
        .get(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::invalid_value(key, format!("'{}': {}", raw, e)))
        })
        .transpose()
}
