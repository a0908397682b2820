//! urlloader - concurrent URL fetching with size and timing reports
//!
//! This library reads URLs from line-oriented inputs, fetches each one over
//! HTTP with a bounded pool of workers, and reports the payload size and the
//! end-to-end elapsed time for every URL.
//!
//! # Architecture
//!
//! ```text
//! UrlSource(s) ──► Producer ──► Dispatch Queue ──► N Workers ──► ResultSink
//!                     │          (bounded MPMC)        │
//!                     └──────── CancellationToken ─────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use urlloader::config::{DispatchConfig, FetchConfig};
//! use urlloader::loader::Loader;
//! use urlloader::pipeline::{ChannelSink, Dispatcher};
//! use urlloader::source::{LineSource, UrlSource};
//!
//! let loader = Arc::new(Loader::new(FetchConfig::default())?);
//! let (sink, mut results) = ChannelSink::new();
//! let sources: Vec<Box<dyn UrlSource>> = vec![Box::new(LineSource::open("urls.txt", 0).await?)];
//!
//! let summary = Dispatcher::new(DispatchConfig::default())
//!     .run(CancellationToken::new(), sources, loader, Arc::new(sink))
//!     .await;
//! ```

pub mod config;
pub mod loader;
pub mod pipeline;
pub mod source;

/// Library version, as declared in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
