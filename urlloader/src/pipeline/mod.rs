//! Concurrent dispatch of URLs to fetch workers.
//!
//! One producer task walks the configured [`UrlSource`](crate::source::UrlSource)s
//! in order and pushes each non-blank, trimmed line into a bounded queue. A
//! fixed pool of workers pulls from the queue, fetches through a
//! [`Fetcher`](crate::loader::Fetcher) and hands every outcome to a
//! [`ResultSink`]. [`Dispatcher::run`] returns once the producer and all
//! workers have stopped.

mod dispatch;
mod sink;

pub use dispatch::{Dispatcher, PipelineSummary};
pub use sink::{ChannelSink, FetchOutcome, ResultSink};
