//! Command-line arguments and their resolution against the config file.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use urlloader::config::{
    parse_duration, ConfigFile, DispatchConfig, FetchConfig, ReaderConfig,
};

use crate::error::CliError;

/// Fetch every URL listed in the given files and report its size and load time.
#[derive(Debug, Parser)]
#[command(name = "urlloader", version, about, long_about = None)]
pub struct Args {
    /// Files with one URL per line ("-" reads standard input)
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<String>,

    /// Leading lines to skip in every file
    #[arg(long = "reader-skip", value_name = "N")]
    pub reader_skip: Option<u64>,

    /// Number of concurrent fetches [default: number of CPUs]
    #[arg(long = "loader-parallel", value_name = "N", value_parser = parse_positive)]
    pub loader_parallel: Option<usize>,

    /// Per-request timeout, e.g. 500ms, 2s, 1m30s [default: 1s]
    #[arg(long = "loader-timeout", value_name = "DURATION", value_parser = parse_timeout)]
    pub loader_timeout: Option<Duration>,

    /// Follow redirects [default: true]
    #[arg(
        long = "loader-redirects",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub loader_redirects: Option<bool>,

    /// Body read buffer size in bytes, 0 for the default [default: 32768]
    #[arg(long = "loader-buffer", value_name = "BYTES")]
    pub loader_buffer: Option<usize>,

    /// Issue HEAD requests and report Content-Length [default: false]
    #[arg(
        long = "loader-use-head",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub loader_use_head: Option<bool>,

    /// Dispatch queue capacity [default: same as --loader-parallel]
    #[arg(long = "loader-queue", value_name = "N", value_parser = parse_positive)]
    pub loader_queue: Option<usize>,

    /// Configuration file [default: <config dir>/urlloader/config.ini]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Fully resolved run settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub fetch: FetchConfig,
    pub dispatch: DispatchConfig,
    pub reader: ReaderConfig,
}

impl Args {
    /// Load the explicit config file, or the default one if it exists.
    pub fn config_file(&self) -> Result<ConfigFile, CliError> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::load_default()?,
        };
        Ok(file)
    }

    /// Merge flags over config file values over defaults.
    pub fn resolve(&self, file: &ConfigFile) -> Result<Settings, CliError> {
        // CLI takes precedence, then config
        let mut fetch = file.fetch_config();
        if let Some(timeout) = self.loader_timeout {
            fetch.timeout = timeout;
        }
        if let Some(buffer) = self.loader_buffer {
            fetch.buffer_size = buffer;
        }
        if let Some(use_head) = self.loader_use_head {
            fetch.use_head = use_head;
        }
        if let Some(redirects) = self.loader_redirects {
            fetch.follow_redirects = redirects;
        }

        let mut dispatch = file.dispatch_config();
        if let Some(parallel) = self.loader_parallel {
            dispatch.workers = parallel;
        }
        if let Some(queue) = self.loader_queue {
            dispatch.queue_capacity = Some(queue);
        }

        let skip = self.reader_skip.or(file.reader.skip).unwrap_or(0);
        let reader = ReaderConfig::new(self.files.clone()).with_skip(skip);

        fetch.validate()?;
        dispatch.validate()?;
        reader.validate()?;

        Ok(Settings {
            fetch,
            dispatch,
            reader,
        })
    }
}

fn parse_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|e| format!("'{}' is not a number: {}", s, e))?;
    if value == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(value)
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    let timeout = parse_duration(s).map_err(|e| e.to_string())?;
    if timeout.is_zero() {
        return Err("must be greater than zero".to_string());
    }
    Ok(timeout)
}
