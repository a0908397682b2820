//! Destinations for fetch outcomes.

use tokio::sync::mpsc;
use tracing::trace;

use crate::loader::{FetchError, FetchResult};

/// Outcome of fetching one URL.
pub type FetchOutcome = Result<FetchResult, FetchError>;

/// Receives one outcome per attempted URL.
///
/// Called concurrently from every worker, so implementations must not block
/// for long.
pub trait ResultSink: Send + Sync + 'static {
    fn accept(&self, outcome: FetchOutcome);
}

/// Sink that forwards outcomes over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<FetchOutcome>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes its outcomes.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FetchOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResultSink for ChannelSink {
    fn accept(&self, outcome: FetchOutcome) {
        if self.tx.send(outcome).is_err() {
            trace!("Result receiver dropped, discarding outcome");
        }
    }
}
