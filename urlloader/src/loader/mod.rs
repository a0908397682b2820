//! Fetching a single URL and measuring its payload.
//!
//! A fetch issues one GET (or HEAD) request under a [`RequestDeadline`],
//! drains the response body with [`count_bytes`], and reports the size and
//! the elapsed time as a [`FetchResult`].
//!
//! # Modes
//!
//! - **GET** (default): size is the number of body bytes received.
//! - **HEAD**: size is the declared `Content-Length`; any body the server
//!   sends anyway is still drained before the connection is released.

mod counter;
mod deadline;
mod error;
mod fetcher;
mod types;

pub use counter::{count_bytes, CountError};
pub use deadline::{Interrupt, RequestDeadline};
pub use error::{FetchError, FetchErrorKind, LoaderError};
pub use fetcher::{BoxFuture, Fetcher, Loader};
pub use types::FetchResult;
