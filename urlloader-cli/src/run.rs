//! Wire inputs, loader and pipeline together.

use std::future::Future;
use std::process;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use urlloader::config::ReaderConfig;
use urlloader::loader::Loader;
use urlloader::pipeline::{Dispatcher, PipelineSummary};
use urlloader::source::{LineSource, UrlSource};

use crate::args::Settings;
use crate::error::CliError;
use crate::output::ConsoleSink;

/// Exit status after a second Ctrl+C.
const FORCED_EXIT_CODE: i32 = 130;

/// Run the pipeline to completion or until interrupted.
pub async fn run(settings: Settings, lifetime: CancellationToken) -> Result<PipelineSummary, CliError> {
    let sources = open_inputs(&settings.reader).await;
    run_sources(settings, sources, lifetime).await
}

async fn run_sources(
    settings: Settings,
    sources: Vec<Box<dyn UrlSource>>,
    lifetime: CancellationToken,
) -> Result<PipelineSummary, CliError> {
    let loader = Arc::new(Loader::new(settings.fetch.clone())?);

    info!(
        inputs = sources.len(),
        workers = settings.dispatch.workers,
        timeout = ?settings.fetch.timeout,
        use_head = settings.fetch.use_head,
        follow_redirects = settings.fetch.follow_redirects,
        "Starting"
    );

    let summary = Dispatcher::new(settings.dispatch)
        .run(lifetime.clone(), sources, loader, Arc::new(ConsoleSink))
        .await;

    if lifetime.is_cancelled() {
        warn!(
            completed = summary.attempted(),
            dispatched = summary.dispatched,
            "Interrupted before all URLs were loaded"
        );
    }
    Ok(summary)
}

/// Drive `future` on `runtime`, then shut the runtime down without waiting
/// for blocking-pool threads.
///
/// A stdin read runs on the blocking pool and cannot be interrupted, so a
/// plain drop of the runtime would hang until the next line arrives.
pub fn drive<F: Future>(runtime: Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    output
}

/// Open every input; ones that cannot be opened are logged and skipped.
async fn open_inputs(reader: &ReaderConfig) -> Vec<Box<dyn UrlSource>> {
    let mut sources: Vec<Box<dyn UrlSource>> = Vec::with_capacity(reader.inputs.len());
    for input in &reader.inputs {
        match LineSource::open(input, reader.skip).await {
            Ok(source) => sources.push(Box::new(source)),
            Err(e) => warn!(input = %input, error = %e, "Skipping input"),
        }
    }
    sources
}

/// Cancel `lifetime` on Ctrl+C; a second Ctrl+C exits immediately.
pub fn install_interrupt_handler(lifetime: &CancellationToken) -> Result<(), CliError> {
    let lifetime = lifetime.clone();
    ctrlc::set_handler(move || {
        if lifetime.is_cancelled() {
            eprintln!("Received second interrupt, exiting");
            process::exit(FORCED_EXIT_CODE);
        }
        eprintln!("Received interrupt, stopping...");
        lifetime.cancel();
    })
    .map_err(|e| CliError::Signal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use urlloader::config::{DispatchConfig, FetchConfig};

    #[tokio::test]
    async fn test_missing_inputs_are_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http://a.example").unwrap();
        let present = file.path().to_str().unwrap().to_string();

        let reader = ReaderConfig::new(vec!["/nonexistent/urls.txt".to_string(), present]);
        let sources = open_inputs(&reader).await;
        assert_eq!(sources.len(), 1);
    }

    #[tokio::test]
    async fn test_run_with_only_invalid_urls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a url\n\nalso not a url").unwrap();

        let settings = Settings {
            fetch: FetchConfig::new().with_timeout(Duration::from_millis(100)),
            dispatch: DispatchConfig::new(2),
            reader: ReaderConfig::new(vec![file.path().to_str().unwrap().to_string()]),
        };

        let summary = run(settings, CancellationToken::new()).await.unwrap();
        assert_eq!(summary.dispatched, 2);
        assert_eq!(summary.failed, 2);
    }

    #[tokio::test]
    async fn test_cancel_stops_run_on_idle_stdin_like_input() {
        // Writer stays open, so the reader never sees a line or EOF.
        let (reader, _writer) = tokio::io::duplex(64);
        let sources: Vec<Box<dyn UrlSource>> =
            vec![Box::new(LineSource::from_reader("stdin", reader))];
        let settings = Settings {
            fetch: FetchConfig::default(),
            dispatch: DispatchConfig::new(2),
            reader: ReaderConfig::new(vec!["-".to_string()]),
        };

        let lifetime = CancellationToken::new();
        let canceller = lifetime.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let summary = tokio::time::timeout(
            Duration::from_secs(5),
            run_sources(settings, sources, lifetime),
        )
        .await
        .expect("run must return after cancellation")
        .unwrap();
        assert_eq!(summary, PipelineSummary::default());
    }

    #[test]
    fn test_drive_does_not_wait_for_blocked_reads() {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let (hold_tx, hold_rx) = std::sync::mpsc::channel::<()>();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();
            let value = drive(runtime, async move {
                let (started_tx, started_rx) = tokio::sync::oneshot::channel();
                // Stands in for a stdin read that never completes.
                tokio::task::spawn_blocking(move || {
                    let _ = started_tx.send(());
                    let _ = hold_rx.recv();
                });
                started_rx.await.unwrap();
                7
            });
            let _ = done_tx.send(value);
        });

        let value = done_rx.recv_timeout(Duration::from_secs(5));
        drop(hold_tx);
        assert_eq!(value.unwrap(), 7);
    }
}
