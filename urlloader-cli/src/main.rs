//! urlloader CLI
//!
//! Reads URLs from files or standard input, fetches them concurrently and
//! prints `Url: <url>, Size: <bytes>, Time: <duration>` for each success.
//! Failures are logged to stderr.

mod args;
mod error;
mod logging;
mod output;
mod run;

use std::process;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use args::Args;
use error::CliError;

fn main() {
    let args = Args::parse();

    if let Err(e) = execute(args) {
        eprintln!("An error occurred: {}", e);
        process::exit(1);
    }
}

fn execute(args: Args) -> Result<(), CliError> {
    let _log_guard = logging::init(
        logging::default_directive(args.verbose, args.quiet),
        args.log_file.as_deref(),
    )?;

    let config_file = args.config_file()?;
    let settings = args.resolve(&config_file)?;
    debug!(?settings, "Resolved settings");

    let lifetime = CancellationToken::new();
    run::install_interrupt_handler(&lifetime)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let summary = run::drive(runtime, run::run(settings, lifetime))?;
    info!(
        dispatched = summary.dispatched,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Done"
    );
    Ok(())
}
