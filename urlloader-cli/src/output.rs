//! Console reporting of fetch outcomes.

use std::io::{self, Write};

use tracing::warn;
use urlloader::config::format_duration;
use urlloader::loader::FetchResult;
use urlloader::pipeline::{FetchOutcome, ResultSink};

/// Prints one line per successful fetch to stdout and logs failures.
#[derive(Debug, Default)]
pub struct ConsoleSink;

/// Result line for a successful fetch.
pub fn format_result(result: &FetchResult) -> String {
    format!(
        "Url: {}, Size: {}, Time: {}",
        result.url,
        result.size,
        format_duration(result.elapsed)
    )
}

impl ResultSink for ConsoleSink {
    fn accept(&self, outcome: FetchOutcome) {
        match outcome {
            Ok(result) => {
                // Lock per line so concurrent workers never interleave output.
                let mut stdout = io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{}", format_result(&result)) {
                    warn!(error = %e, "Failed to write result");
                }
            }
            Err(e) => warn!(url = e.url(), kind = %e.kind(), "{}", e),
        }
    }
}
