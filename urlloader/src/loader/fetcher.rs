//! HTTP fetch operation.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Instant;

use futures_util::TryStreamExt;
use reqwest::header::CONTENT_LENGTH;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Response, Url};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::counter::count_bytes;
use super::deadline::RequestDeadline;
use super::error::{FetchError, LoaderError};
use super::types::FetchResult;
use crate::config::FetchConfig;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can fetch a URL and report its size.
///
/// The pipeline only depends on this trait, which keeps it testable with
/// in-process fakes.
pub trait Fetcher: Send + Sync + 'static {
    /// Fetch `url`, giving up when `lifetime` is cancelled.
    fn fetch<'a>(
        &'a self,
        lifetime: &'a CancellationToken,
        url: &'a str,
    ) -> BoxFuture<'a, Result<FetchResult, FetchError>>;
}

/// HTTP loader backed by a shared `reqwest` client.
///
/// The client and its connection pool are created once and never mutated;
/// every worker shares the same loader.
#[derive(Debug, Clone)]
pub struct Loader {
    client: Client,
    config: FetchConfig,
}

impl Loader {
    /// Create a loader with a client configured from `config`.
    ///
    /// With `follow_redirects` disabled the client stops at the first
    /// redirect and treats it as the final response.
    pub fn new(config: FetchConfig) -> Result<Self, LoaderError> {
        config.validate()?;

        let policy = if config.follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };
        let client = Client::builder()
            .redirect(policy)
            .build()
            .map_err(LoaderError::ClientBuild)?;

        Ok(Self::with_client(client, config))
    }

    /// Create a loader around an existing client.
    ///
    /// The client's redirect policy is used as-is.
    pub fn with_client(client: Client, mut config: FetchConfig) -> Self {
        config.buffer_size = config.effective_buffer_size();
        Self { client, config }
    }

    /// The effective configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch one URL and measure it.
    ///
    /// The elapsed time covers connection setup, header exchange and the full
    /// body drain (or header parse and drain in HEAD mode).
    pub async fn load(
        &self,
        lifetime: &CancellationToken,
        raw_url: &str,
    ) -> Result<FetchResult, FetchError> {
        let url = Url::parse(raw_url).map_err(|e| FetchError::InvalidUrl {
            url: raw_url.to_string(),
            reason: e.to_string(),
        })?;

        let deadline = RequestDeadline::new(lifetime, self.config.timeout);
        let start = Instant::now();

        let size = if self.config.use_head {
            self.size_by_head(url, raw_url, &deadline).await
        } else {
            self.size_by_get(url, raw_url, &deadline).await
        };
        let elapsed = start.elapsed();

        match size {
            Ok(size) => {
                debug!(
                    url = raw_url,
                    size,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Fetch complete"
                );
                Ok(FetchResult::new(raw_url, size, elapsed))
            }
            Err(e) => {
                debug!(
                    url = raw_url,
                    kind = %e.kind(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Fetch failed"
                );
                Err(e)
            }
        }
    }

    async fn size_by_get(
        &self,
        url: Url,
        raw_url: &str,
        deadline: &RequestDeadline,
    ) -> Result<u64, FetchError> {
        let response = self.send(Method::GET, url, raw_url, deadline).await?;

        let body = body_reader(response);
        tokio::pin!(body);

        count_bytes(&mut body, self.config.buffer_size, deadline)
            .await
            .map_err(|e| FetchError::from_count(raw_url, e, deadline.timeout()))
    }

    async fn size_by_head(
        &self,
        url: Url,
        raw_url: &str,
        deadline: &RequestDeadline,
    ) -> Result<u64, FetchError> {
        let response = self.send(Method::HEAD, url, raw_url, deadline).await?;
        let size = content_length(&response, raw_url);

        // A HEAD response should carry no body, but whatever arrives is
        // drained so the connection goes back to the pool clean.
        let body = body_reader(response);
        tokio::pin!(body);
        match count_bytes(&mut body, self.config.buffer_size, deadline).await {
            Ok(0) => {}
            Ok(bytes) => debug!(url = raw_url, bytes, "Drained unexpected HEAD response body"),
            Err(e) => debug!(url = raw_url, error = %e, "Failed to drain HEAD response body"),
        }

        size
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        raw_url: &str,
        deadline: &RequestDeadline,
    ) -> Result<Response, FetchError> {
        trace!(url = raw_url, %method, "Sending request");

        let request = self.client.request(method, url).send();
        let response = match deadline.run(request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(FetchError::from_reqwest(raw_url, e, deadline.timeout())),
            Err(reason) => {
                return Err(FetchError::interrupted(raw_url, reason, deadline.timeout()))
            }
        };

        debug!(
            url = raw_url,
            status = response.status().as_u16(),
            "Response headers received"
        );
        Ok(response)
    }
}

impl Fetcher for Loader {
    fn fetch<'a>(
        &'a self,
        lifetime: &'a CancellationToken,
        url: &'a str,
    ) -> BoxFuture<'a, Result<FetchResult, FetchError>> {
        Box::pin(self.load(lifetime, url))
    }
}

fn body_reader(response: Response) -> impl tokio::io::AsyncRead {
    StreamReader::new(response.bytes_stream().map_err(io::Error::other))
}

/// Parse the declared `Content-Length` as an unsigned decimal.
fn content_length(response: &Response, raw_url: &str) -> Result<u64, FetchError> {
    let missing = |reason: String| FetchError::MissingSizeMetadata {
        url: raw_url.to_string(),
        reason,
    };

    let value = response
        .headers()
        .get(CONTENT_LENGTH)
        .ok_or_else(|| missing("Content-Length header is missing".to_string()))?;
    let text = value
        .to_str()
        .map_err(|e| missing(format!("failed to parse Content-Length header: {}", e)))?
        .trim();

    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(missing(format!(
            "failed to parse Content-Length header: '{}'",
            text
        )));
    }
    text.parse::<u64>()
        .map_err(|e| missing(format!("failed to parse Content-Length header: {}", e)))
}
