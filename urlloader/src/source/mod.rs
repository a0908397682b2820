//! URL inputs for the dispatch pipeline.
//!
//! A [`UrlSource`] yields raw lines one at a time. The pipeline treats
//! exhaustion (`Ok(None)`) and read errors alike: it stops pulling from that
//! source and moves on to the next one.

mod line;

use std::io;

use thiserror::Error;

use crate::loader::BoxFuture;

pub use line::LineSource;

/// Name used for standard input.
pub const STDIN_NAME: &str = "-";

/// Errors raised by URL sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The input could not be opened.
    #[error("failed to open {name}: {source}")]
    Open {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Skipping leading lines failed.
    #[error("failed to skip lines in {name}: {source}")]
    Skip {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Reading the next line failed.
    #[error("failed to read line from {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// A sequence of raw lines, pulled one at a time.
pub trait UrlSource: Send {
    /// Human-readable input name for logs.
    fn name(&self) -> &str;

    /// Next line, or `Ok(None)` once the input is exhausted.
    fn next_line(&mut self) -> BoxFuture<'_, Result<Option<String>, SourceError>>;
}
